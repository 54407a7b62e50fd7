use crate::characteristic::{Characteristic, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisTag {
    Primary,
    Secondary,
}

/// Which value axis each selected characteristic is drawn against.
///
/// At most two axes exist. The first selected characteristic's unit owns the
/// primary axis; every other unit, however many there are, shares the
/// secondary axis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AxisAssignment {
    entries: Vec<(Characteristic, AxisTag)>,
    primary_unit: Option<&'static str>,
    secondary_units: Vec<&'static str>,
}

impl AxisAssignment {
    pub fn allocate(selection: &Selection) -> Self {
        let Some(first) = selection.first() else {
            return AxisAssignment::default();
        };
        let primary_unit = first.unit();
        let mut secondary_units: Vec<&'static str> = Vec::new();
        let entries = selection
            .iter()
            .map(|characteristic| {
                let unit = characteristic.unit();
                if unit == primary_unit {
                    (characteristic, AxisTag::Primary)
                } else {
                    if !secondary_units.contains(&unit) {
                        secondary_units.push(unit);
                    }
                    (characteristic, AxisTag::Secondary)
                }
            })
            .collect();
        AxisAssignment {
            entries,
            primary_unit: Some(primary_unit),
            secondary_units,
        }
    }

    pub fn axis_for(&self, characteristic: Characteristic) -> Option<AxisTag> {
        self.entries
            .iter()
            .find(|(c, _)| *c == characteristic)
            .map(|(_, tag)| *tag)
    }

    pub fn members(&self, tag: AxisTag) -> impl Iterator<Item = Characteristic> + '_ {
        self.entries
            .iter()
            .filter(move |(_, t)| *t == tag)
            .map(|(c, _)| *c)
    }

    pub fn entries(&self) -> &[(Characteristic, AxisTag)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_secondary(&self) -> bool {
        !self.secondary_units.is_empty()
    }

    /// Units folded onto the secondary axis, e.g. `mm / hPa`.
    pub fn secondary_label(&self) -> Option<String> {
        if self.secondary_units.is_empty() {
            None
        } else {
            Some(self.secondary_units.join(" / "))
        }
    }

    pub fn unit_label(&self, tag: AxisTag) -> Option<String> {
        match tag {
            AxisTag::Primary => self.primary_unit.map(str::to_string),
            AxisTag::Secondary => self.secondary_label(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(ids: &[&str]) -> Selection {
        Selection::from_ids(ids.iter().copied()).expect("known ids")
    }

    #[test]
    fn empty_selection_is_inert() {
        let assignment = AxisAssignment::allocate(&Selection::new());
        assert!(assignment.is_empty());
        assert!(!assignment.has_secondary());
        assert_eq!(assignment.unit_label(AxisTag::Primary), None);
    }

    #[test]
    fn every_single_characteristic_goes_primary() {
        for characteristic in Characteristic::ALL {
            let assignment =
                AxisAssignment::allocate(&Selection::with_default(characteristic));
            assert_eq!(assignment.axis_for(characteristic), Some(AxisTag::Primary));
            assert!(!assignment.has_secondary());
            assert_eq!(
                assignment.unit_label(AxisTag::Primary).as_deref(),
                Some(characteristic.unit())
            );
        }
    }

    #[test]
    fn shared_unit_needs_one_axis() {
        let assignment =
            AxisAssignment::allocate(&selection(&["temperature_2m_max", "temperature_2m_min"]));
        assert!(!assignment.has_secondary());
        assert_eq!(assignment.members(AxisTag::Primary).count(), 2);
        assert_eq!(assignment.unit_label(AxisTag::Primary).as_deref(), Some("°C"));
    }

    #[test]
    fn temperature_and_precipitation_need_a_secondary_axis() {
        let assignment =
            AxisAssignment::allocate(&selection(&["temperature_2m_max", "precipitation_sum"]));
        assert!(assignment.has_secondary());
        assert_eq!(
            assignment.axis_for(Characteristic::TemperatureMax),
            Some(AxisTag::Primary)
        );
        assert_eq!(
            assignment.axis_for(Characteristic::PrecipitationSum),
            Some(AxisTag::Secondary)
        );
        assert_eq!(assignment.unit_label(AxisTag::Primary).as_deref(), Some("°C"));
        assert_eq!(assignment.unit_label(AxisTag::Secondary).as_deref(), Some("mm"));
    }

    #[test]
    fn first_selected_unit_claims_primary() {
        let assignment = AxisAssignment::allocate(&selection(&[
            "pressure_msl_mean",
            "temperature_2m_max",
            "temperature_2m_min",
        ]));
        assert_eq!(assignment.unit_label(AxisTag::Primary).as_deref(), Some("hPa"));
        assert_eq!(
            assignment.members(AxisTag::Secondary).collect::<Vec<_>>(),
            vec![Characteristic::TemperatureMax, Characteristic::TemperatureMin]
        );
    }

    #[test]
    fn extra_units_fold_onto_the_secondary_axis() {
        let assignment = AxisAssignment::allocate(&selection(&[
            "temperature_2m_max",
            "precipitation_sum",
            "temperature_2m_min",
            "pressure_msl_mean",
            "relative_humidity_2m_max",
        ]));
        assert!(assignment.has_secondary());
        assert_eq!(
            assignment.secondary_label().as_deref(),
            Some("mm / hPa / %")
        );
        assert_eq!(
            assignment.members(AxisTag::Primary).collect::<Vec<_>>(),
            vec![Characteristic::TemperatureMax, Characteristic::TemperatureMin]
        );
        let assigned = assignment.members(AxisTag::Primary).count()
            + assignment.members(AxisTag::Secondary).count();
        assert_eq!(assigned, 5);
    }
}
