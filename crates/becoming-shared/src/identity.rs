//! Identity catalog and tag normalization.

use serde::Serialize;

use crate::constants::MAX_IDENTITY_LEN;

/// A suggested identity a user can adopt. Users are not restricted to the
/// catalog; any non-empty tag is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdentityOption {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

pub const CATALOG: &[IdentityOption] = &[
    IdentityOption {
        id: "learner",
        label: "I am a Learner",
        description: "Constantly growing and expanding knowledge",
    },
    IdentityOption {
        id: "healthy",
        label: "I am Healthy",
        description: "Taking care of body and mind",
    },
    IdentityOption {
        id: "financially-disciplined",
        label: "I am Financially Disciplined",
        description: "Building wealth and security",
    },
    IdentityOption {
        id: "developer",
        label: "I am a Skilled Developer",
        description: "Mastering the craft of coding",
    },
    IdentityOption {
        id: "mindful",
        label: "I am Mindful",
        description: "Present and aware in every moment",
    },
    IdentityOption {
        id: "connected",
        label: "I am Connected",
        description: "Building meaningful relationships",
    },
    IdentityOption {
        id: "creative",
        label: "I am Creative",
        description: "Expressing unique ideas and vision",
    },
    IdentityOption {
        id: "compassionate",
        label: "I am Compassionate",
        description: "Caring for others and myself",
    },
];

pub fn catalog() -> &'static [IdentityOption] {
    CATALOG
}

/// Canonical form of an identity tag: trimmed and lower-cased. Returns
/// `None` for blank or over-long tags.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let tag = raw.trim().to_lowercase();
    if tag.is_empty() || tag.chars().count() > MAX_IDENTITY_LEN {
        return None;
    }
    Some(tag)
}
