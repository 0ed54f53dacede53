//! Typed imaging effect configuration.
//!
//! Effect plugins are addressed by an id string and configured through a
//! loosely typed property set. Everything inside the crate works with
//! [`ImagingEffectConfig`]; the string protocol only exists at the
//! platform boundary via [`ImagingEffectConfig::to_property_set`] and
//! [`ImagingEffectConfig::from_property_set`].

use crate::error::EffectError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Activatable id of the imaging effect component
pub const IMAGING_EFFECT_ID: &str = "ImagingEffects.ImagingEffect";

/// Property key listing the filter names in application order
pub const FILTER_LIST_KEY: &str = "filterList";

/// Value stored in an effect property set
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
}

/// String keyed configuration handed to an effect plugin
pub type PropertySet = BTreeMap<String, PropertyValue>;

/// Vignetting strength of the lomo filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LomoVignetting {
    Low = 0,
    Medium = 1,
    High = 2,
}

impl LomoVignetting {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            _ => None,
        }
    }
}

/// Colour cast of the lomo filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LomoStyle {
    Neutral = 0,
    Red = 1,
    Green = 2,
    Blue = 3,
    Yellow = 4,
}

impl LomoStyle {
    fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Neutral),
            1 => Some(Self::Red),
            2 => Some(Self::Green),
            3 => Some(Self::Blue),
            4 => Some(Self::Yellow),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LomoFilter {
    pub brightness: f64,
    pub saturation: f64,
    pub vignetting: LomoVignetting,
    pub style: LomoStyle,
}

impl Default for LomoFilter {
    fn default() -> Self {
        Self {
            brightness: 0.5,
            saturation: 0.8,
            vignetting: LomoVignetting::High,
            style: LomoStyle::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolarizeFilter {
    pub threshold: f64,
}

impl Default for SolarizeFilter {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// One filter in the effect chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FilterConfig {
    Lomo(LomoFilter),
    Solarize(SolarizeFilter),
}

impl FilterConfig {
    /// Name the plugin uses for this filter, also its property key
    pub fn name(&self) -> &'static str {
        match self {
            FilterConfig::Lomo(_) => "LomoFilter",
            FilterConfig::Solarize(_) => "SolarizeFilter",
        }
    }

    /// Encode the filter parameters as the plugin's comma separated string
    pub fn parameter_string(&self) -> String {
        match self {
            FilterConfig::Lomo(lomo) => format!(
                "{},{},{},{}",
                lomo.brightness, lomo.saturation, lomo.vignetting as i32, lomo.style as i32
            ),
            FilterConfig::Solarize(solarize) => format!("{}", solarize.threshold),
        }
    }

    fn validate(&self) -> Result<(), EffectError> {
        match self {
            FilterConfig::Lomo(lomo) => {
                check_unit("brightness", lomo.brightness)?;
                check_unit("saturation", lomo.saturation)
            }
            FilterConfig::Solarize(solarize) => check_unit("threshold", solarize.threshold),
        }
    }

    fn parse(name: &str, params: &str) -> Result<Self, EffectError> {
        let fields: Vec<&str> = params.split(',').map(str::trim).collect();
        match name {
            "LomoFilter" => {
                if fields.len() != 4 {
                    return Err(malformed(
                        name,
                        format!("expected 4 fields, found {}", fields.len()),
                    ));
                }
                let brightness = parse_float(name, fields[0])?;
                let saturation = parse_float(name, fields[1])?;
                let vignetting = parse_int(name, fields[2])
                    .and_then(|code| {
                        LomoVignetting::from_code(code)
                            .ok_or_else(|| malformed(name, format!("vignetting code {}", code)))
                    })?;
                let style = parse_int(name, fields[3]).and_then(|code| {
                    LomoStyle::from_code(code)
                        .ok_or_else(|| malformed(name, format!("style code {}", code)))
                })?;
                Ok(FilterConfig::Lomo(LomoFilter {
                    brightness,
                    saturation,
                    vignetting,
                    style,
                }))
            }
            "SolarizeFilter" => {
                // an empty parameter string selects the plugin default
                if params.trim().is_empty() {
                    return Ok(FilterConfig::Solarize(SolarizeFilter::default()));
                }
                Ok(FilterConfig::Solarize(SolarizeFilter {
                    threshold: parse_float(name, fields[0])?,
                }))
            }
            other => Err(EffectError::UnknownFilter {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for FilterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.parameter_string())
    }
}

/// Effect chain attached to a capture stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingEffectConfig {
    pub filters: Vec<FilterConfig>,
}

impl Default for ImagingEffectConfig {
    fn default() -> Self {
        Self {
            filters: vec![FilterConfig::Lomo(LomoFilter::default())],
        }
    }
}

impl ImagingEffectConfig {
    pub fn validate(&self) -> Result<(), EffectError> {
        if self.filters.is_empty() {
            return Err(EffectError::Empty);
        }

        // parameters are keyed by filter name in the property set
        let mut seen = BTreeSet::new();
        for filter in &self.filters {
            if !seen.insert(filter.name()) {
                return Err(EffectError::DuplicateFilter {
                    name: filter.name().to_string(),
                });
            }
        }

        self.filters.iter().try_for_each(FilterConfig::validate)
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.name().to_string()).collect()
    }

    /// Build the property set understood by the imaging effect plugin
    pub fn to_property_set(&self) -> PropertySet {
        let mut set = PropertySet::new();
        set.insert(
            FILTER_LIST_KEY.to_string(),
            PropertyValue::List(self.filter_names()),
        );
        for filter in &self.filters {
            set.insert(
                filter.name().to_string(),
                PropertyValue::Text(filter.parameter_string()),
            );
        }
        set
    }

    /// Decode a plugin property set back into a typed configuration
    pub fn from_property_set(set: &PropertySet) -> Result<Self, EffectError> {
        let names = match set.get(FILTER_LIST_KEY) {
            Some(PropertyValue::List(names)) => names,
            Some(PropertyValue::Text(_)) => {
                return Err(malformed(FILTER_LIST_KEY, "expected a list".to_string()))
            }
            None => {
                return Err(EffectError::MissingProperty {
                    key: FILTER_LIST_KEY.to_string(),
                })
            }
        };

        let filters = names
            .iter()
            .map(|name| match set.get(name) {
                Some(PropertyValue::Text(params)) => FilterConfig::parse(name, params),
                Some(PropertyValue::List(_)) => {
                    Err(malformed(name, "expected a parameter string".to_string()))
                }
                None => Err(EffectError::MissingProperty { key: name.clone() }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let config = Self { filters };
        config.validate()?;
        Ok(config)
    }
}

impl fmt::Display for ImagingEffectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.filters.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), EffectError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(EffectError::InvalidParameter {
            name,
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

fn malformed(key: &str, details: String) -> EffectError {
    EffectError::Malformed {
        key: key.to_string(),
        details,
    }
}

fn parse_float(key: &str, field: &str) -> Result<f64, EffectError> {
    field
        .parse::<f64>()
        .map_err(|e| malformed(key, format!("'{}': {}", field, e)))
}

fn parse_int(key: &str, field: &str) -> Result<i64, EffectError> {
    field
        .parse::<i64>()
        .map_err(|e| malformed(key, format!("'{}': {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lomo_property_set() {
        let set = ImagingEffectConfig::default().to_property_set();

        assert_eq!(
            set.get(FILTER_LIST_KEY),
            Some(&PropertyValue::List(vec!["LomoFilter".to_string()]))
        );
        assert_eq!(
            set.get("LomoFilter"),
            Some(&PropertyValue::Text("0.5,0.8,2,3".to_string()))
        );
    }

    #[test]
    fn test_parse_plugin_property_set() {
        let mut set = PropertySet::new();
        set.insert(
            FILTER_LIST_KEY.to_string(),
            PropertyValue::List(vec!["LomoFilter".to_string(), "SolarizeFilter".to_string()]),
        );
        set.insert(
            "LomoFilter".to_string(),
            PropertyValue::Text("0.25, 1, 0, 4".to_string()),
        );
        set.insert(
            "SolarizeFilter".to_string(),
            PropertyValue::Text(String::new()),
        );

        let config = ImagingEffectConfig::from_property_set(&set).unwrap();
        assert_eq!(
            config.filters,
            vec![
                FilterConfig::Lomo(LomoFilter {
                    brightness: 0.25,
                    saturation: 1.0,
                    vignetting: LomoVignetting::Low,
                    style: LomoStyle::Yellow,
                }),
                FilterConfig::Solarize(SolarizeFilter::default()),
            ]
        );
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let config = ImagingEffectConfig {
            filters: vec![FilterConfig::Lomo(LomoFilter {
                brightness: 1.5,
                ..LomoFilter::default()
            })],
        };

        assert!(matches!(
            config.validate(),
            Err(EffectError::InvalidParameter {
                name: "brightness",
                ..
            })
        ));

        let empty = ImagingEffectConfig { filters: vec![] };
        assert_eq!(empty.validate(), Err(EffectError::Empty));
    }

    #[test]
    fn test_validation_rejects_repeated_filter() {
        let config = ImagingEffectConfig {
            filters: vec![
                FilterConfig::Lomo(LomoFilter {
                    brightness: 0.1,
                    ..LomoFilter::default()
                }),
                FilterConfig::Solarize(SolarizeFilter::default()),
                FilterConfig::Lomo(LomoFilter {
                    brightness: 0.9,
                    ..LomoFilter::default()
                }),
            ],
        };
        assert_eq!(
            config.validate(),
            Err(EffectError::DuplicateFilter {
                name: "LomoFilter".to_string()
            })
        );

        // a repeated name in the plugin list is rejected on decode too
        let mut set = ImagingEffectConfig::default().to_property_set();
        set.insert(
            FILTER_LIST_KEY.to_string(),
            PropertyValue::List(vec!["LomoFilter".to_string(), "LomoFilter".to_string()]),
        );
        assert!(matches!(
            ImagingEffectConfig::from_property_set(&set),
            Err(EffectError::DuplicateFilter { .. })
        ));
    }

    #[test]
    fn test_malformed_property_sets() {
        let mut set = PropertySet::new();
        assert!(matches!(
            ImagingEffectConfig::from_property_set(&set),
            Err(EffectError::MissingProperty { .. })
        ));

        set.insert(
            FILTER_LIST_KEY.to_string(),
            PropertyValue::List(vec!["LomoFilter".to_string()]),
        );
        set.insert(
            "LomoFilter".to_string(),
            PropertyValue::Text("0.5,0.8,9,3".to_string()),
        );
        assert!(matches!(
            ImagingEffectConfig::from_property_set(&set),
            Err(EffectError::Malformed { .. })
        ));

        set.insert(
            FILTER_LIST_KEY.to_string(),
            PropertyValue::List(vec!["SepiaFilter".to_string()]),
        );
        set.insert(
            "SepiaFilter".to_string(),
            PropertyValue::Text("1".to_string()),
        );
        assert_eq!(
            ImagingEffectConfig::from_property_set(&set),
            Err(EffectError::UnknownFilter {
                name: "SepiaFilter".to_string()
            })
        );
    }

    #[test]
    fn test_display() {
        let config = ImagingEffectConfig::default();
        assert_eq!(config.to_string(), "[LomoFilter(0.5,0.8,2,3)]");
    }
}
