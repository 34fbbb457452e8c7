use super::props::{append_element, new_property, proxies};
use super::{MigrationStep, StepContext, StepMeta, release};
use pvstate_types::{Transition, Version};
use pvstate_xml::{Document, Query};
use std::collections::BTreeSet;

/// CTHPart used to take volume arrays through one property per scalar type.
pub struct CthVolumeArraysStep;

impl CthVolumeArraysStep {
    const KEY: &'static str = "pv.4_0_to_4_1";

    const LEGACY_PROPERTIES: [&'static str; 3] = [
        "AddDoubleVolumeArrayName",
        "AddFloatVolumeArrayName",
        "AddUnsignedCharVolumeArrayName",
    ];
}

impl MigrationStep for CthVolumeArraysStep {
    fn meta(&self) -> StepMeta {
        StepMeta {
            key: Self::KEY,
            transition: Transition::new(Version::new(4, 0, 0), release(4, 1)),
            title: "Merge CTHPart volume array properties",
            description: "Folds AddDoubleVolumeArrayName, AddFloatVolumeArrayName and \
                AddUnsignedCharVolumeArrayName into a single sorted, de-duplicated \
                VolumeArrays property on every CTHPart filter.",
            uses_session: false,
        }
    }

    fn apply(&self, doc: &mut Document, ctx: &mut StepContext<'_>) -> anyhow::Result<()> {
        let legacy = Query::descendants("Property").attr_in("name", &Self::LEGACY_PROPERTIES);

        for proxy in proxies(doc, ctx.root_tag(), "filters", Some("CTHPart")) {
            let root = ctx.search_root(doc, proxy);
            let found = doc.select_all(root, &legacy);

            let mut arrays = BTreeSet::new();
            for prop in &found {
                for element in doc.child_elements_named(*prop, "Element") {
                    if let Some(value) = doc.attribute(element, "value") {
                        arrays.insert(value.to_string());
                    }
                }
            }
            doc.purge(&found);

            if arrays.is_empty() {
                continue;
            }
            tracing::debug!(proxy = %proxy, arrays = arrays.len(), "merged CTHPart volume arrays");
            let prop = new_property(doc, proxy, None, "VolumeArrays", arrays.len())?;
            for (index, name) in arrays.iter().enumerate() {
                append_element(doc, prop, index, name)?;
            }
        }
        Ok(())
    }
}
