use super::{MigrationStep, StepContext, StepMeta, release};
use pvstate_types::Transition;
use pvstate_xml::{Document, Query};

/// Cube axes colour is no longer a linkable global property.
pub struct CubeAxesLinkStep;

impl MigrationStep for CubeAxesLinkStep {
    fn meta(&self) -> StepMeta {
        StepMeta {
            key: "pv.4_2_to_5_1",
            transition: Transition::new(release(4, 2), release(5, 1)),
            title: "Drop CubeAxesColor global property links",
            description: "Removes every GlobalPropertyLink whose property is CubeAxesColor; \
                the cube axes representation no longer exposes that property.",
            uses_session: false,
        }
    }

    fn apply(&self, doc: &mut Document, _ctx: &mut StepContext<'_>) -> anyhow::Result<()> {
        let query = Query::descendants("GlobalPropertyLink").attr_eq("property", "CubeAxesColor");
        let found = doc.select_all(doc.document_node(), &query);
        let removed = doc.purge(&found);
        if removed > 0 {
            tracing::debug!(removed, "dropped CubeAxesColor links");
        }
        Ok(())
    }
}
