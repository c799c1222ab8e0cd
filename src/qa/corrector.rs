//! Relationship-direction check for generated Cypher.
//!
//! Every single-hop pattern in the query is compared against the
//! relationship triples of the graph schema. A hop drawn backwards is
//! flipped in place; a hop that fits the schema in neither direction rejects
//! the whole query.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::graph::Relationship;

static PROPERTY_MAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.+?\}").expect("property pattern"));

static NODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.+?\)").expect("node pattern"));

/// `(left)<-[rel]->(right)`; group 6 is the right node.
static PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\([^,()]*?(\{.+\})?[^,()]*?\))(<?-)(\[.*?\])?(->?)(\([^,()]*?(\{.+\})?[^,()]*?\))",
    )
    .expect("path pattern")
});

static NODE_REL_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\()+(?P<left_node>[^()]*?)\)(?P<relation>.*?)\((?P<right_node>[^()]*?)(\))+",
    )
    .expect("hop pattern")
});

static REL_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":(?P<rel_type>.+?)?(\{.+\})?\]").expect("relation type pattern"));

/// Outcome of [`CypherQueryCorrector::correct`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    /// Safe to run; arrows may have been flipped.
    Accepted(String),
    /// Some hop matches no schema relationship in either direction.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Outgoing,
    Incoming,
    Both,
}

#[derive(Debug, Clone, Default)]
pub struct CypherQueryCorrector {
    schema: Vec<Relationship>,
}

impl CypherQueryCorrector {
    pub fn new(schema: Vec<Relationship>) -> Self {
        Self { schema }
    }

    pub fn correct(&self, query: &str) -> Validated {
        let variables = detect_node_variables(query);
        let mut corrected = query.to_string();

        for path in extract_paths(query) {
            let mut start = 0;
            while start < path.len() {
                let Some(caps) = NODE_REL_NODE.captures(&path[start..]) else {
                    break;
                };
                let hop = &caps[0];
                let left = &caps["left_node"];
                let relation = &caps["relation"];
                let right = &caps["right_node"];
                let step = left.len() + relation.len() + 2;

                let (direction, types) = relation_types(relation);
                if types.iter().any(|t| t.contains('*')) {
                    start += step;
                    continue;
                }

                let left_labels = labels_for(left, &variables);
                let right_labels = labels_for(right, &variables);
                let forward = self.verify(&left_labels, &types, &right_labels);

                match direction {
                    Direction::Outgoing if !forward => {
                        if !self.verify(&right_labels, &types, &left_labels) {
                            return Validated::Rejected;
                        }
                        let flipped = format!("<{}", &relation[..relation.len() - 1]);
                        corrected = corrected.replace(hop, &hop.replace(relation, &flipped));
                    }
                    Direction::Incoming if !self.verify(&right_labels, &types, &left_labels) => {
                        if !forward {
                            return Validated::Rejected;
                        }
                        let flipped = format!("{}>", &relation[1..]);
                        corrected = corrected.replace(hop, &hop.replace(relation, &flipped));
                    }
                    Direction::Both
                        if !forward && !self.verify(&right_labels, &types, &left_labels) =>
                    {
                        return Validated::Rejected;
                    }
                    _ => {}
                }
                start += step;
            }
        }

        Validated::Accepted(corrected)
    }

    /// True when some schema triple fits. Empty label or type lists match
    /// anything.
    fn verify(&self, from: &[String], types: &[String], to: &[String]) -> bool {
        let from: Vec<&str> = from.iter().map(|l| l.trim_matches('`')).collect();
        let to: Vec<&str> = to.iter().map(|l| l.trim_matches('`')).collect();
        let types: Vec<&str> = types.iter().map(|t| t.trim_matches('`')).collect();

        self.schema.iter().any(|r| {
            (from.is_empty() || from.contains(&r.start.as_str()))
                && (to.is_empty() || to.contains(&r.end.as_str()))
                && (types.is_empty() || types.contains(&r.rel_type.as_str()))
        })
    }
}

fn clean_node(node: &str) -> String {
    PROPERTY_MAP.replace_all(node, "").replace(['(', ')'], "").trim().to_string()
}

/// Variable → labels, gathered from every parenthesised group in the query.
fn detect_node_variables(query: &str) -> HashMap<String, Vec<String>> {
    let mut out: HashMap<String, Vec<String>> = HashMap::new();
    for m in NODE.find_iter(query) {
        let node = clean_node(m.as_str());
        let mut parts = node.split(':').map(str::trim);
        let variable = parts.next().unwrap_or_default().to_string();
        out.entry(variable).or_default().extend(parts.map(str::to_string));
    }
    out
}

/// Single-hop path texts. Each search resumes at the previous right node, so
/// `(a)-->(b)-->(c)` yields both hops.
fn extract_paths(query: &str) -> Vec<&str> {
    let mut paths = Vec::new();
    let mut idx = 0;
    while let Some(caps) = PATH.captures(&query[idx..]) {
        let (Some(whole), Some(right)) = (caps.get(0), caps.get(6)) else {
            break;
        };
        paths.push(&query[idx + whole.start()..idx + whole.end()]);
        idx += right.start();
    }
    paths
}

/// Labels of one side of a hop. Named nodes use every label the query gives
/// that variable; anonymous nodes use their inline labels.
fn labels_for(node: &str, variables: &HashMap<String, Vec<String>>) -> Vec<String> {
    let node = clean_node(node);
    let mut parts = node.split(':').map(str::trim);
    let variable = parts.next().unwrap_or_default();
    let inline: Vec<String> = parts.filter(|l| !l.is_empty()).map(str::to_string).collect();

    if variable.is_empty() {
        return inline;
    }
    match variables.get(variable) {
        Some(labels) => labels.iter().filter(|l| !l.is_empty()).cloned().collect(),
        None => inline,
    }
}

fn relation_types(relation: &str) -> (Direction, Vec<String>) {
    let direction = if relation.ends_with('>') {
        Direction::Outgoing
    } else if relation.starts_with('<') {
        Direction::Incoming
    } else {
        Direction::Both
    };

    let bare = PROPERTY_MAP.replace_all(relation, "");
    let types = REL_TYPE
        .captures(&bare)
        .and_then(|c| c.name("rel_type"))
        .map(|m| {
            m.as_str()
                .split('|')
                .map(|t| t.trim().trim_matches('!').to_string())
                .collect()
        })
        .unwrap_or_default();

    (direction, types)
}
