//! Profile mappings: enquiry to polymorphic profile links.
//!
//! # Purpose
//! A mapping ties one enquiry to one concrete profile document. The target is
//! identified by a `profile_id` plus a discriminant naming the profile
//! collection (`profile_type_ref`), alongside a business tag (`profile_type`).
//!
//! # Key invariants
//! - At the boundary the pair is a [`ProfileRef`], one variant per profile
//!   kind, so tag and collection cannot disagree.
//! - Stored records keep the untyped pair; both discriminants are derived
//!   from the same `ProfileRef` on every write.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Project,
    Product,
    Amc,
    Complaint,
    Info,
    Job,
    SiteVisit,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 7] = [
        ProfileKind::Project,
        ProfileKind::Product,
        ProfileKind::Amc,
        ProfileKind::Complaint,
        ProfileKind::Info,
        ProfileKind::Job,
        ProfileKind::SiteVisit,
    ];

    /// Business tag stored in `profile_type`.
    pub fn tag(self) -> &'static str {
        match self {
            ProfileKind::Project => "project",
            ProfileKind::Product => "product",
            ProfileKind::Amc => "amc",
            ProfileKind::Complaint => "complaint",
            ProfileKind::Info => "info",
            ProfileKind::Job => "job",
            ProfileKind::SiteVisit => "site_visit",
        }
    }

    /// Concrete profile collection stored in `profile_type_ref`.
    pub fn collection(self) -> &'static str {
        match self {
            ProfileKind::Project => "ProjectProfile",
            ProfileKind::Product => "ProductProfile",
            ProfileKind::Amc => "AmcProfile",
            ProfileKind::Complaint => "ComplaintProfile",
            ProfileKind::Info => "InfoProfile",
            ProfileKind::Job => "JobProfile",
            ProfileKind::SiteVisit => "SiteVisitProfile",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn from_collection(collection: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection() == collection)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileRefError {
    #[error("profile_type must be one of project, product, amc, complaint, info, job, site_visit (got {0})")]
    UnknownType(String),
    #[error("profile_type_ref is not a known profile collection: {0}")]
    UnknownCollection(String),
    #[error("profile_type {profile_type} does not match profile_type_ref {profile_type_ref}")]
    Mismatch {
        profile_type: String,
        profile_type_ref: String,
    },
    #[error("profile_id is required")]
    MissingId,
}

/// Typed reference to one concrete profile document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProfileRef {
    Project(String),
    Product(String),
    Amc(String),
    Complaint(String),
    Info(String),
    Job(String),
    SiteVisit(String),
}

impl ProfileRef {
    pub fn new(kind: ProfileKind, profile_id: impl Into<String>) -> Self {
        let id = profile_id.into();
        match kind {
            ProfileKind::Project => ProfileRef::Project(id),
            ProfileKind::Product => ProfileRef::Product(id),
            ProfileKind::Amc => ProfileRef::Amc(id),
            ProfileKind::Complaint => ProfileRef::Complaint(id),
            ProfileKind::Info => ProfileRef::Info(id),
            ProfileKind::Job => ProfileRef::Job(id),
            ProfileKind::SiteVisit => ProfileRef::SiteVisit(id),
        }
    }

    /// Resolve the wire/storage triple into a typed reference.
    ///
    /// # Errors
    /// - Unknown tag or collection, a tag/collection disagreement, or a blank id.
    pub fn from_parts(
        profile_type: &str,
        profile_type_ref: &str,
        profile_id: &str,
    ) -> Result<Self, ProfileRefError> {
        let kind = ProfileKind::from_tag(profile_type)
            .ok_or_else(|| ProfileRefError::UnknownType(profile_type.to_string()))?;
        let collection = ProfileKind::from_collection(profile_type_ref)
            .ok_or_else(|| ProfileRefError::UnknownCollection(profile_type_ref.to_string()))?;
        if kind != collection {
            return Err(ProfileRefError::Mismatch {
                profile_type: profile_type.to_string(),
                profile_type_ref: profile_type_ref.to_string(),
            });
        }
        let profile_id = profile_id.trim();
        if profile_id.is_empty() {
            return Err(ProfileRefError::MissingId);
        }
        Ok(Self::new(kind, profile_id))
    }

    pub fn kind(&self) -> ProfileKind {
        match self {
            ProfileRef::Project(_) => ProfileKind::Project,
            ProfileRef::Product(_) => ProfileKind::Product,
            ProfileRef::Amc(_) => ProfileKind::Amc,
            ProfileRef::Complaint(_) => ProfileKind::Complaint,
            ProfileRef::Info(_) => ProfileKind::Info,
            ProfileRef::Job(_) => ProfileKind::Job,
            ProfileRef::SiteVisit(_) => ProfileKind::SiteVisit,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ProfileRef::Project(id)
            | ProfileRef::Product(id)
            | ProfileRef::Amc(id)
            | ProfileRef::Complaint(id)
            | ProfileRef::Info(id)
            | ProfileRef::Job(id)
            | ProfileRef::SiteVisit(id) => id,
        }
    }

    pub fn collection(&self) -> &'static str {
        self.kind().collection()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ProfileMapping {
    #[schema(example = "MAP-20261016-0001")]
    pub mapping_id: String,
    pub enquiry_id: String,
    pub profile_type: ProfileKind,
    pub profile_id: String,
    #[schema(example = "JobProfile")]
    pub profile_type_ref: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileMapping {
    fn set_profile(&mut self, profile: ProfileRef) {
        self.profile_type = profile.kind();
        self.profile_type_ref = profile.collection().to_string();
        self.profile_id = match profile {
            ProfileRef::Project(id)
            | ProfileRef::Product(id)
            | ProfileRef::Amc(id)
            | ProfileRef::Complaint(id)
            | ProfileRef::Info(id)
            | ProfileRef::Job(id)
            | ProfileRef::SiteVisit(id) => id,
        };
    }
}

/// Validated input for a new mapping; the business key is assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfileMapping {
    pub enquiry_id: String,
    pub profile: ProfileRef,
    pub created_by: String,
}

impl NewProfileMapping {
    pub fn into_mapping(self, mapping_id: String, now: DateTime<Utc>) -> ProfileMapping {
        let mut mapping = ProfileMapping {
            mapping_id,
            enquiry_id: self.enquiry_id,
            profile_type: self.profile.kind(),
            profile_id: String::new(),
            profile_type_ref: String::new(),
            created_by: self.created_by,
            created_at: now,
            updated_at: now,
        };
        mapping.set_profile(self.profile);
        mapping
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileMappingPatch {
    pub enquiry_id: Option<String>,
    pub profile: Option<ProfileRef>,
}

impl ProfileMappingPatch {
    pub fn is_empty(&self) -> bool {
        self.enquiry_id.is_none() && self.profile.is_none()
    }

    /// Apply the present fields and refresh `updated_at`. `mapping_id`,
    /// `created_by`, and `created_at` are never touched.
    pub fn apply(self, mapping: &mut ProfileMapping, now: DateTime<Utc>) {
        if let Some(enquiry_id) = self.enquiry_id {
            mapping.enquiry_id = enquiry_id;
        }
        if let Some(profile) = self.profile {
            mapping.set_profile(profile);
        }
        mapping.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileMappingFilter {
    pub enquiry_id: Option<String>,
    pub profile_type: Option<ProfileKind>,
}

impl ProfileMappingFilter {
    pub fn matches(&self, mapping: &ProfileMapping) -> bool {
        self.enquiry_id
            .as_deref()
            .is_none_or(|enquiry_id| mapping.enquiry_id == enquiry_id)
            && self
                .profile_type
                .is_none_or(|kind| mapping.profile_type == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn every_kind_resolves_from_matching_parts() {
        for kind in ProfileKind::ALL {
            let profile =
                ProfileRef::from_parts(kind.tag(), kind.collection(), "p-1").expect("resolve");
            assert_eq!(profile.kind(), kind);
            assert_eq!(profile.id(), "p-1");
        }
    }

    #[test]
    fn mismatched_parts_are_rejected() {
        assert_eq!(
            ProfileRef::from_parts("job", "AmcProfile", "p-1"),
            Err(ProfileRefError::Mismatch {
                profile_type: "job".to_string(),
                profile_type_ref: "AmcProfile".to_string(),
            })
        );
        assert_eq!(
            ProfileRef::from_parts("visit", "JobProfile", "p-1"),
            Err(ProfileRefError::UnknownType("visit".to_string()))
        );
        assert_eq!(
            ProfileRef::from_parts("job", "Jobs", "p-1"),
            Err(ProfileRefError::UnknownCollection("Jobs".to_string()))
        );
        assert_eq!(
            ProfileRef::from_parts("job", "JobProfile", "  "),
            Err(ProfileRefError::MissingId)
        );
    }

    #[test]
    fn stored_pair_tracks_profile_changes() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let mut mapping = NewProfileMapping {
            enquiry_id: "enq-1".to_string(),
            profile: ProfileRef::Job("job-9".to_string()),
            created_by: "user-1".to_string(),
        }
        .into_mapping("MAP-20260601-0001".to_string(), now);
        assert_eq!(mapping.profile_type, ProfileKind::Job);
        assert_eq!(mapping.profile_type_ref, "JobProfile");
        assert_eq!(mapping.profile_id, "job-9");

        ProfileMappingPatch {
            profile: Some(ProfileRef::SiteVisit("sv-2".to_string())),
            ..ProfileMappingPatch::default()
        }
        .apply(&mut mapping, now);
        assert_eq!(mapping.profile_type, ProfileKind::SiteVisit);
        assert_eq!(mapping.profile_id, "sv-2");
        assert_eq!(mapping.profile_type_ref, "SiteVisitProfile");
        assert_eq!(mapping.created_by, "user-1");
    }

    #[test]
    fn profile_kind_serializes_as_tag() {
        let json = serde_json::to_string(&ProfileKind::SiteVisit).expect("serialize");
        assert_eq!(json, r#""site_visit""#);
        for kind in ProfileKind::ALL {
            let json = serde_json::to_value(kind).expect("serialize");
            assert_eq!(json, kind.tag());
        }
    }
}
