use nalgebra::Vector3;
use std::collections::BTreeMap;
use std::fmt;

/// A value attached to an atom, a residue or a frame under a string key.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Bool(bool),
    Double(f64),
    String(String),
    Vector3D(Vector3<f64>),
}

/// Properties are kept sorted by key so that writers emit them in a stable order.
pub type PropertyMap = BTreeMap<String, Property>;

impl Property {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_vector3d(&self) -> Option<Vector3<f64>> {
        match self {
            Self::Vector3D(value) => Some(*value),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Vector3D(_) => "vector3d",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Double(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value}"),
            Self::Vector3D(value) => write!(f, "{} {} {}", value.x, value.y, value.z),
        }
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Property {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Vector3<f64>> for Property {
    fn from(value: Vector3<f64>) -> Self {
        Self::Vector3D(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_only_match_their_own_variant() {
        let property = Property::from("alpha helix");
        assert_eq!(property.as_str(), Some("alpha helix"));
        assert_eq!(property.as_bool(), None);
        assert_eq!(property.kind(), "string");

        assert_eq!(Property::from(true).as_bool(), Some(true));
        assert_eq!(Property::from(2.5).as_double(), Some(2.5));
        assert_eq!(Property::from(2.5).as_str(), None);
    }

    #[test]
    fn display_writes_vectors_as_space_separated_components() {
        let property = Property::from(Vector3::new(1.0, -2.5, 3.0));
        assert_eq!(property.to_string(), "1 -2.5 3");
        assert_eq!(Property::from(false).to_string(), "false");
    }
}
