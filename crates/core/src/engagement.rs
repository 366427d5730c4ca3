//! Per-user engagement with a review.
//!
//! A gesture is stored as a boolean: `true` is a like, `false` a dislike.
//! The absence of a row is [`EngagementState::NoAction`].

use serde::{Deserialize, Serialize};

/// Engagement state of one user towards one review.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementState {
    NoAction,
    Liked,
    Disliked,
}

impl EngagementState {
    /// Map a stored gesture (or its absence) to a state.
    pub fn from_gesture(gesture: Option<bool>) -> Self {
        match gesture {
            None => Self::NoAction,
            Some(true) => Self::Liked,
            Some(false) => Self::Disliked,
        }
    }
}

/// Result of a like request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The like was recorded.
    Liked,
    /// The user already liked or disliked the review; nothing changed.
    AlreadyActed(EngagementState),
}

/// Result of a dislike request.
///
/// Dislikes converge: whatever the previous state, the user ends up `Disliked`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DislikeOutcome {
    pub previous: EngagementState,
}

impl DislikeOutcome {
    /// Whether the dislike changed the stored state.
    pub fn changed(&self) -> bool {
        self.previous != EngagementState::Disliked
    }
}

/// Like and dislike counts for a review.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub likes: u64,
    pub dislikes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_gesture() {
        assert_eq!(EngagementState::from_gesture(None), EngagementState::NoAction);
        assert_eq!(EngagementState::from_gesture(Some(true)), EngagementState::Liked);
        assert_eq!(
            EngagementState::from_gesture(Some(false)),
            EngagementState::Disliked
        );
    }

    #[test]
    fn test_dislike_changed() {
        let repeat = DislikeOutcome {
            previous: EngagementState::Disliked,
        };
        assert!(!repeat.changed());

        let flipped = DislikeOutcome {
            previous: EngagementState::Liked,
        };
        assert!(flipped.changed());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&EngagementState::NoAction).unwrap();
        assert_eq!(json, "\"no_action\"");
    }
}
