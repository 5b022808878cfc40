use std::collections::HashMap;

/// How a lifted metadata tag's raw string value should be transformed
/// before it's stored in its target field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TagTransform {
    /// Store the raw string verbatim.
    Verbatim,
    /// Canonicalize into a lowercase identifier string (e.g. `UUID`).
    CanonicalId,
    /// Wrap into a singleton set (e.g. `link`, which may repeat and
    /// accumulate across several tag occurrences on the same entity).
    SingletonSet,
    /// Parse against the `AccountType` enumeration.
    AccountType,
}

/// Where a lifted tag's value is written on the entity under
/// construction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LiftTarget {
    ExternalId,
    Links,
    AccountType,
    Payee,
    Uuid,
}

/// One row of the metadata-tag lift table: recognized tag name → target
/// field and the transform to apply to its value, per §4.2.
#[derive(Clone, Copy, Debug)]
pub struct TagLift {
    pub target: LiftTarget,
    pub transform: TagTransform,
}

/// An injected catalog of the closed enumerations and the metadata-tag
/// lift table referenced throughout the data model and interpreter.
///
/// Constructed once via [`SchemaCatalog::standard`] and threaded
/// explicitly by the caller -- never read from a global or thread-local,
/// so that two concurrent ingests with different configurations cannot
/// interfere with each other.
#[derive(Clone, Debug)]
pub struct SchemaCatalog {
    tag_lifts: HashMap<String, TagLift>,
    tax_group_keywords: Vec<String>,
}

impl SchemaCatalog {
    /// The catalog used by default: the tag names and tax-group keywords
    /// this system recognizes out of the box.
    pub fn standard() -> Self {
        let mut tag_lifts = HashMap::new();
        tag_lifts.insert(
            "uuid".to_string(),
            TagLift { target: LiftTarget::Uuid, transform: TagTransform::CanonicalId },
        );
        tag_lifts.insert(
            "link".to_string(),
            TagLift { target: LiftTarget::Links, transform: TagTransform::SingletonSet },
        );
        tag_lifts.insert(
            "type".to_string(),
            TagLift { target: LiftTarget::AccountType, transform: TagTransform::AccountType },
        );
        tag_lifts.insert(
            "external-id".to_string(),
            TagLift { target: LiftTarget::ExternalId, transform: TagTransform::Verbatim },
        );
        tag_lifts.insert(
            "payee".to_string(),
            TagLift { target: LiftTarget::Payee, transform: TagTransform::Verbatim },
        );

        SchemaCatalog {
            tag_lifts,
            tax_group_keywords: vec![
                "sales".to_string(),
                "vat".to_string(),
                "excise".to_string(),
            ],
        }
    }

    /// Look up the lift rule for a metadata tag name, matched
    /// case-insensitively per the reference's `UUID`/`Payee` mixed-case
    /// tag names.
    pub fn lookup_tag(&self, name: &str) -> Option<&TagLift> {
        self.tag_lifts.get(&name.to_lowercase())
    }

    pub fn is_tax_group(&self, keyword: &str) -> bool {
        self.tax_group_keywords.iter().any(|k| k == keyword)
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        SchemaCatalog::standard()
    }
}
