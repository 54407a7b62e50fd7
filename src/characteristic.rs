use std::fmt;
use std::str::FromStr;

use ratatui::style::Color;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown characteristic `{0}`")]
pub struct UnknownCharacteristicError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub color: Color,
}

/// Everything the dashboard can plot, in registry (table column) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Characteristic {
    TemperatureMax,
    TemperatureMin,
    PrecipitationSum,
    PressureMean,
    WindSpeedMax,
    HumidityMax,
}

const DESCRIPTORS: [CharacteristicDescriptor; 6] = [
    CharacteristicDescriptor {
        id: "temperature_2m_max",
        label: "Temperature Max",
        unit: "°C",
        color: Color::Rgb(0xef, 0x44, 0x44),
    },
    CharacteristicDescriptor {
        id: "temperature_2m_min",
        label: "Temperature Min",
        unit: "°C",
        color: Color::Rgb(0x3b, 0x82, 0xf6),
    },
    CharacteristicDescriptor {
        id: "precipitation_sum",
        label: "Precipitation Sum",
        unit: "mm",
        color: Color::Rgb(0x60, 0xa5, 0xfa),
    },
    CharacteristicDescriptor {
        id: "pressure_msl_mean",
        label: "Pressure Mean",
        unit: "hPa",
        color: Color::Rgb(0xa7, 0x8b, 0xfa),
    },
    CharacteristicDescriptor {
        id: "wind_speed_10m_max",
        label: "Wind Speed Max",
        unit: "km/h",
        color: Color::Rgb(0x38, 0xbd, 0xf8),
    },
    CharacteristicDescriptor {
        id: "relative_humidity_2m_max",
        label: "Humidity Max",
        unit: "%",
        color: Color::Rgb(0x22, 0xc5, 0x5e),
    },
];

impl Characteristic {
    pub const ALL: [Characteristic; 6] = [
        Characteristic::TemperatureMax,
        Characteristic::TemperatureMin,
        Characteristic::PrecipitationSum,
        Characteristic::PressureMean,
        Characteristic::WindSpeedMax,
        Characteristic::HumidityMax,
    ];

    pub fn index(self) -> usize {
        match self {
            Characteristic::TemperatureMax => 0,
            Characteristic::TemperatureMin => 1,
            Characteristic::PrecipitationSum => 2,
            Characteristic::PressureMean => 3,
            Characteristic::WindSpeedMax => 4,
            Characteristic::HumidityMax => 5,
        }
    }

    pub fn descriptor(self) -> &'static CharacteristicDescriptor {
        &DESCRIPTORS[self.index()]
    }

    pub fn id(self) -> &'static str {
        self.descriptor().id
    }

    pub fn label(self) -> &'static str {
        self.descriptor().label
    }

    pub fn unit(self) -> &'static str {
        self.descriptor().unit
    }

    pub fn color(self) -> Color {
        self.descriptor().color
    }

    /// Reverse lookup from a rendered series name.
    pub fn from_label(label: &str) -> Option<Characteristic> {
        Characteristic::ALL
            .iter()
            .copied()
            .find(|c| c.label() == label)
    }

    /// Key binding slot, `1`..=`6`.
    pub fn from_hotkey(key: char) -> Option<Characteristic> {
        let digit = key.to_digit(10)? as usize;
        if digit == 0 {
            return None;
        }
        Characteristic::ALL.get(digit - 1).copied()
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Characteristic {
    type Err = UnknownCharacteristicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Characteristic::ALL
            .iter()
            .copied()
            .find(|c| c.id() == trimmed)
            .ok_or_else(|| UnknownCharacteristicError(trimmed.to_string()))
    }
}

/// Ordered set of plotted characteristics. Order drives legend order and
/// which unit claims the primary axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    items: Vec<Characteristic>,
}

impl Selection {
    pub fn new() -> Self {
        Selection::default()
    }

    pub fn with_default(initial: Characteristic) -> Self {
        Selection {
            items: vec![initial],
        }
    }

    pub fn from_ids<I, S>(ids: I) -> Result<Self, UnknownCharacteristicError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selection = Selection::new();
        for id in ids {
            let characteristic: Characteristic = id.as_ref().parse()?;
            if !selection.contains(characteristic) {
                selection.items.push(characteristic);
            }
        }
        Ok(selection)
    }

    /// Removes the characteristic if selected, appends it otherwise.
    /// Returns whether it is selected afterwards.
    pub fn toggle(&mut self, characteristic: Characteristic) -> bool {
        if let Some(pos) = self.items.iter().position(|c| *c == characteristic) {
            self.items.remove(pos);
            false
        } else {
            self.items.push(characteristic);
            true
        }
    }

    pub fn toggle_id(&mut self, id: &str) -> Result<bool, UnknownCharacteristicError> {
        let characteristic: Characteristic = id.parse()?;
        Ok(self.toggle(characteristic))
    }

    pub fn contains(&self, characteristic: Characteristic) -> bool {
        self.items.contains(&characteristic)
    }

    pub fn iter(&self) -> impl Iterator<Item = Characteristic> + '_ {
        self.items.iter().copied()
    }

    pub fn as_slice(&self) -> &[Characteristic] {
        &self.items
    }

    pub fn first(&self) -> Option<Characteristic> {
        self.items.first().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_ids_and_colors_are_unique() {
        let ids: HashSet<_> = Characteristic::ALL.iter().map(|c| c.id()).collect();
        let colors: HashSet<_> = Characteristic::ALL
            .iter()
            .map(|c| format!("{:?}", c.color()))
            .collect();
        assert_eq!(ids.len(), Characteristic::ALL.len());
        assert_eq!(colors.len(), Characteristic::ALL.len());
        for (idx, c) in Characteristic::ALL.iter().enumerate() {
            assert_eq!(c.index(), idx);
        }
    }

    #[test]
    fn parses_ids_and_rejects_unknown() {
        assert_eq!(
            "precipitation_sum".parse::<Characteristic>(),
            Ok(Characteristic::PrecipitationSum)
        );
        let err = "snowfall".parse::<Characteristic>().unwrap_err();
        assert_eq!(err, UnknownCharacteristicError("snowfall".to_string()));
    }

    #[test]
    fn reverse_lookup_by_label() {
        assert_eq!(
            Characteristic::from_label("Wind Speed Max"),
            Some(Characteristic::WindSpeedMax)
        );
        assert_eq!(Characteristic::from_label("Wind"), None);
    }

    #[test]
    fn toggle_twice_restores_contents_and_order() {
        let mut selection = Selection::from_ids(["pressure_msl_mean", "temperature_2m_max"])
            .expect("known ids");
        let before = selection.clone();
        assert!(selection.toggle(Characteristic::HumidityMax));
        assert!(!selection.toggle(Characteristic::HumidityMax));
        assert_eq!(selection, before);

        assert!(!selection.toggle(Characteristic::PressureMean));
        assert!(selection.toggle(Characteristic::PressureMean));
        assert_eq!(
            selection.as_slice(),
            &[Characteristic::TemperatureMax, Characteristic::PressureMean]
        );
    }

    #[test]
    fn unknown_toggle_leaves_selection_untouched() {
        let mut selection = Selection::with_default(Characteristic::TemperatureMax);
        let before = selection.clone();
        assert!(selection.toggle_id("uv_index").is_err());
        assert_eq!(selection, before);
        assert_eq!(selection.toggle_id("temperature_2m_min"), Ok(true));
        assert_eq!(selection.len(), 2);
    }

    #[test]
    fn hotkeys_map_to_registry_order() {
        assert_eq!(
            Characteristic::from_hotkey('1'),
            Some(Characteristic::TemperatureMax)
        );
        assert_eq!(
            Characteristic::from_hotkey('6'),
            Some(Characteristic::HumidityMax)
        );
        assert_eq!(Characteristic::from_hotkey('0'), None);
        assert_eq!(Characteristic::from_hotkey('7'), None);
    }
}
