use crate::ports::SessionLookup;
use pvstate_types::schema::SERVER_MANAGER_STATE;
use pvstate_types::{MigrationWarning, Transition, Version, WarningKind};
use pvstate_xml::{Document, NodeId};

mod chart_axes;
mod lights;
mod props;
mod v4_1;
mod v4_2;
mod v5_1;
mod v5_4;
mod v5_5;

/// One forward schema transition.
///
/// A step receives the whole state document and edits it in place. Steps must
/// be conditional on the presence of what they rewrite, so running one on a
/// document that has nothing to migrate leaves it unchanged.
pub trait MigrationStep {
    fn meta(&self) -> StepMeta;

    fn apply(&self, doc: &mut Document, ctx: &mut StepContext<'_>) -> anyhow::Result<()>;
}

/// Static description of a step, used by listings and explanations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMeta {
    /// Stable key, e.g. `pv.4_1_to_4_2`.
    pub key: &'static str,
    pub transition: Transition,
    pub title: &'static str,
    pub description: &'static str,
    /// Whether some edit in this step consults the live session.
    pub uses_session: bool,
}

/// Where per-proxy lookups search for properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryScope {
    /// Only inside the proxy being migrated.
    #[default]
    Proxy,
    /// Anywhere in the document. Kept for reproducing output of older tools,
    /// which let a lookup for one proxy match properties of another.
    Document,
}

impl QueryScope {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryScope::Proxy => "proxy",
            QueryScope::Document => "document",
        }
    }
}

impl std::str::FromStr for QueryScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "proxy" => Ok(QueryScope::Proxy),
            "document" => Ok(QueryScope::Document),
            other => Err(format!(
                "unknown query scope {other:?} (expected \"proxy\" or \"document\")"
            )),
        }
    }
}

/// Per-step state handed to [`MigrationStep::apply`].
pub struct StepContext<'a> {
    session: Option<&'a dyn SessionLookup>,
    scope: QueryScope,
    transition: Transition,
    root_tag: &'a str,
    warnings: Vec<MigrationWarning>,
}

impl<'a> StepContext<'a> {
    pub fn new(
        session: Option<&'a dyn SessionLookup>,
        scope: QueryScope,
        transition: Transition,
    ) -> Self {
        Self {
            session,
            scope,
            transition,
            root_tag: SERVER_MANAGER_STATE,
            warnings: Vec::new(),
        }
    }

    /// Tag of the state root the document was built from.
    pub fn with_root_tag(mut self, root_tag: &'a str) -> Self {
        self.root_tag = root_tag;
        self
    }

    pub fn session(&self) -> Option<&'a dyn SessionLookup> {
        self.session
    }

    pub fn scope(&self) -> QueryScope {
        self.scope
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    pub fn root_tag(&self) -> &'a str {
        self.root_tag
    }

    /// Node that per-proxy lookups for `proxy` start from.
    pub fn search_root(&self, doc: &Document, proxy: NodeId) -> NodeId {
        match self.scope {
            QueryScope::Proxy => proxy,
            QueryScope::Document => doc.document_node(),
        }
    }

    /// Record an advisory. Repeats of the same condition within a step are
    /// collapsed into one.
    pub fn warn(&mut self, kind: WarningKind, message: &str) {
        if self
            .warnings
            .iter()
            .any(|w| w.kind == kind && w.message == message)
        {
            return;
        }
        tracing::warn!(transition = %self.transition, kind = %kind, "{message}");
        self.warnings
            .push(MigrationWarning::new(kind, message).during(self.transition));
    }

    pub fn warnings(&self) -> &[MigrationWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<MigrationWarning> {
        self.warnings
    }
}

/// The built-in release chain, ordered by target version.
pub fn builtin_steps() -> Vec<Box<dyn MigrationStep>> {
    vec![
        Box::new(v4_1::CthVolumeArraysStep),
        Box::new(v4_2::Release42Step),
        Box::new(v5_1::CubeAxesLinkStep),
        Box::new(v5_4::ScalarBarLayoutStep),
        Box::new(v5_5::Release55Step),
    ]
}

pub fn builtin_step_metas() -> Vec<StepMeta> {
    builtin_steps().iter().map(|s| s.meta()).collect()
}

pub(crate) const fn release(major: u32, minor: u32) -> Version {
    Version::new(major, minor, 0)
}
