//! The four fixed reference-photo viewpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One reference-photo viewpoint. Processing order is `ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Front,
    Left,
    Right,
    Back,
}

impl Position {
    /// Every position, in processing order.
    pub const ALL: [Position; 4] = [Self::Front, Self::Left, Self::Right, Self::Back];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Left => "left",
            Self::Right => "right",
            Self::Back => "back",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a user's reference photos, one nullable reference per position.
///
/// Blank strings are treated the same as `None` everywhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImages {
    #[serde(default)]
    pub front: Option<String>,
    #[serde(default)]
    pub left: Option<String>,
    #[serde(default)]
    pub right: Option<String>,
    #[serde(default)]
    pub back: Option<String>,
}

impl ReferenceImages {
    /// Reference stored for `position`, ignoring blank values.
    pub fn get(&self, position: Position) -> Option<&str> {
        let value = match position {
            Position::Front => &self.front,
            Position::Left => &self.left,
            Position::Right => &self.right,
            Position::Back => &self.back,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Positions that carry a usable reference, in processing order.
    pub fn present(&self) -> Vec<(Position, &str)> {
        Position::ALL
            .into_iter()
            .filter_map(|p| self.get(p).map(|r| (p, r)))
            .collect()
    }

    /// Number of non-null positions.
    pub fn count(&self) -> usize {
        Position::ALL.into_iter().filter(|p| self.get(*p).is_some()).count()
    }

    /// Copy with blank values collapsed to `None`.
    pub fn normalized(&self) -> Self {
        Self {
            front: self.get(Position::Front).map(str::to_string),
            left: self.get(Position::Left).map(str::to_string),
            right: self.get(Position::Right).map(str::to_string),
            back: self.get(Position::Back).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_references_are_absent() {
        let refs = ReferenceImages {
            front: Some("users/u1/front.jpg".into()),
            left: Some("   ".into()),
            right: None,
            back: Some(String::new()),
        };
        assert_eq!(refs.count(), 1);
        assert_eq!(refs.present(), vec![(Position::Front, "users/u1/front.jpg")]);
        assert_eq!(refs.normalized().left, None);
    }

    #[test]
    fn present_keeps_processing_order() {
        let refs = ReferenceImages {
            front: None,
            left: Some("l".into()),
            right: Some("r".into()),
            back: Some("b".into()),
        };
        let order: Vec<_> = refs.present().into_iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![Position::Left, Position::Right, Position::Back]);
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let refs: ReferenceImages = serde_json::from_str(r#"{"front":"a"}"#).unwrap();
        assert_eq!(refs.count(), 1);
        assert!(refs.back.is_none());
    }
}
