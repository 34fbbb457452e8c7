//! Per-axis fan-out of the packed chart view properties.
//!
//! Older chart views stored one property holding the values for all four
//! axes back to back. Each pass below splits such a property into one
//! property per valid output, inserted where the packed one used to be.

use super::props::{append_element, element_value, new_property};
use pvstate_xml::{Document, NodeId, Query, XmlResult};

const AXES: [&str; 4] = ["Left", "Bottom", "Right", "Top"];

struct FanOut {
    names: &'static [&'static str],
    components: usize,
    outputs: usize,
    valid: fn(&Document, NodeId, usize) -> bool,
    rename: fn(&str, usize) -> String,
}

const PASSES: [FanOut; 5] = [
    FanOut {
        names: &["AxisColor", "AxisGridColor", "AxisLabelColor", "AxisTitleColor"],
        components: 3,
        outputs: 4,
        valid: xy_chart_axis,
        rename: axis_prefixed,
    },
    FanOut {
        names: &["LeftAxisRange", "BottomAxisRange", "RightAxisRange", "TopAxisRange"],
        components: 1,
        outputs: 2,
        valid: always,
        rename: range_bound,
    },
    FanOut {
        names: &["AxisLabelFont", "AxisTitleFont"],
        components: 4,
        outputs: 4,
        valid: xy_chart_axis,
        rename: axis_prefixed,
    },
    FanOut {
        names: &[
            "ChartTitleFont",
            "LeftAxisLabelFont",
            "BottomAxisLabelFont",
            "RightAxisLabelFont",
            "TopAxisLabelFont",
            "LeftAxisTitleFont",
            "BottomAxisTitleFont",
            "RightAxisTitleFont",
            "TopAxisTitleFont",
        ],
        components: 1,
        outputs: 4,
        valid: always,
        rename: font_facet,
    },
    FanOut {
        names: &[
            "AxisLabelNotation",
            "AxisLabelPrecision",
            "AxisLogScale",
            "AxisTitle",
            "AxisUseCustomLabels",
            "AxisUseCustomRange",
            "ShowAxisGrid",
            "ShowAxisLabels",
        ],
        components: 1,
        outputs: 4,
        valid: xy_chart_axis,
        rename: axis_prefixed,
    },
];

fn always(_: &Document, _: NodeId, _: usize) -> bool {
    true
}

/// Left and bottom exist on every chart; right and top only on XY charts.
fn xy_chart_axis(doc: &Document, view: NodeId, output: usize) -> bool {
    output < 2 || (output < 4 && doc.attribute(view, "type") == Some("XYChartView"))
}

fn axis_prefixed(name: &str, output: usize) -> String {
    match AXES.get(output) {
        Some(axis) => format!("{axis}{name}"),
        None => name.to_string(),
    }
}

fn range_bound(name: &str, output: usize) -> String {
    match output {
        0 => format!("{name}Minimum"),
        1 => format!("{name}Maximum"),
        _ => name.to_string(),
    }
}

fn font_facet(name: &str, output: usize) -> String {
    match output {
        0 => format!("{name}Family"),
        1 => format!("{name}Size"),
        2 => name.replacen("Font", "Bold", 1),
        3 => name.replacen("Font", "Italic", 1),
        _ => name.to_string(),
    }
}

impl FanOut {
    fn run(&self, doc: &mut Document, root_tag: &str) -> XmlResult<usize> {
        let query = Query::descendants(root_tag)
            .child("Proxy")
            .attr_eq("group", "views")
            .child("Property")
            .attr_in("name", self.names);

        let packed = doc.select_all(doc.document_node(), &query);
        for &old in &packed {
            let Some(view) = doc.parent(old) else {
                continue;
            };
            let old_name = doc.attribute(old, "name").unwrap_or_default().to_string();

            for output in 0..self.outputs {
                if !(self.valid)(doc, view, output) {
                    continue;
                }
                let values: Vec<String> = (0..self.components)
                    .map(|c| {
                        element_value(doc, old, output * self.components + c)
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect();
                let name = (self.rename)(&old_name, output);
                let prop = new_property(doc, view, Some(old), &name, self.components)?;
                for (c, value) in values.iter().enumerate() {
                    append_element(doc, prop, c, value)?;
                }
            }
            doc.remove(old);
        }
        Ok(packed.len())
    }
}

/// Run every fan-out pass in order; returns how many packed properties were split.
pub(super) fn split_packed_axis_properties(
    doc: &mut Document,
    root_tag: &str,
) -> XmlResult<usize> {
    let mut split = 0;
    for pass in &PASSES {
        split += pass.run(doc, root_tag)?;
    }
    if split > 0 {
        tracing::debug!(split, "split packed chart axis properties");
    }
    Ok(split)
}
