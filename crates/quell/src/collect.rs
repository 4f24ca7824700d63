//! Field collection: flattening one level of a selection set into the ordered map of response
//! keys that execution resolves.
//!
//! Fragments are expanded in place when their type condition matches the concrete object type,
//! `@skip`/`@include` conditionals are applied, and fields sharing a response key are merged.
//! Key order is first-seen order and becomes the key order of the response object.

use std::collections::{HashMap, HashSet};

use async_graphql_parser::{
    types::{Directive, Field, FragmentDefinition, Selection, SelectionSet},
    Pos, Positioned,
};
use async_graphql_value::{ConstValue, Name, Variables};
use indexmap::IndexMap;

use crate::{
    error::{ErrorClassification, ServerError, ServerResult},
    registry::{scalars::const_value_kind_str, ObjectType, Registry},
};

/// The field nodes contributing to one response key at one level of the query.
///
/// Validation guarantees all contributing nodes share a name and arguments; the first-seen node
/// is the primary one for metadata lookups.
#[derive(Debug)]
pub struct MergedField<'a> {
    nodes: Vec<&'a Positioned<Field>>,
}

impl<'a> MergedField<'a> {
    pub fn primary(&self) -> &'a Positioned<Field> {
        self.nodes.first().expect("a merged field always has at least one node")
    }

    pub fn name(&self) -> &'a str {
        self.primary().node.name.node.as_str()
    }

    pub fn response_key(&self) -> &'a str {
        self.primary().node.response_key().node.as_str()
    }

    pub fn pos(&self) -> Pos {
        self.primary().pos
    }

    pub fn nodes(&self) -> &[&'a Positioned<Field>] {
        &self.nodes
    }

    /// The sub-selections of every contributing node, in contribution order. Collecting a child
    /// level walks all of them.
    pub fn selection_sets(&self) -> impl Iterator<Item = &'a SelectionSet> + '_ {
        self.nodes.iter().map(|field| &field.node.selection_set.node)
    }
}

/// An insertion-ordered map of response key to [`MergedField`].
#[derive(Debug, Default)]
pub struct MergedSelectionSet<'a> {
    fields: IndexMap<&'a str, MergedField<'a>>,
}

impl<'a> MergedSelectionSet<'a> {
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, response_key: &str) -> Option<&MergedField<'a>> {
        self.fields.get(response_key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &MergedField<'a>)> + '_ {
        self.fields.iter().map(|(key, merged)| (*key, merged))
    }

    pub fn response_keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.fields.keys().copied()
    }
}

/// Collects the merged selection set of `object_type` out of one or more selection sets.
///
/// A composite field passes the sub-selections of every contributing node here; the operation
/// root passes its single root selection set.
pub fn collect_fields<'a>(
    registry: &Registry,
    object_type: &ObjectType,
    selection_sets: impl IntoIterator<Item = &'a SelectionSet>,
    variables: &Variables,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
) -> ServerResult<MergedSelectionSet<'a>> {
    let mut collector = Collector {
        registry,
        object_type,
        variables,
        fragments,
        visited_fragments: HashSet::new(),
    };
    let mut fields = IndexMap::new();
    for selection_set in selection_sets {
        collector.collect_into(selection_set, &mut fields)?;
    }
    Ok(MergedSelectionSet { fields })
}

struct Collector<'a, 'r> {
    registry: &'r Registry,
    object_type: &'r ObjectType,
    variables: &'r Variables,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    /// Guards against fragment cycles and duplicate spreads: each fragment expands at most once
    /// per collection call.
    visited_fragments: HashSet<&'a str>,
}

impl<'a> Collector<'a, '_> {
    fn collect_into(
        &mut self,
        selection_set: &'a SelectionSet,
        fields: &mut IndexMap<&'a str, MergedField<'a>>,
    ) -> ServerResult<()> {
        for selection in &selection_set.items {
            match &selection.node {
                Selection::Field(field) => {
                    if !should_include(&field.node.directives, self.variables)? {
                        continue;
                    }
                    let key = field.node.response_key().node.as_str();
                    fields
                        .entry(key)
                        .or_insert_with(|| MergedField { nodes: Vec::new() })
                        .nodes
                        .push(field);
                }
                Selection::InlineFragment(inline) => {
                    if !should_include(&inline.node.directives, self.variables)? {
                        continue;
                    }
                    let matches = inline
                        .node
                        .type_condition
                        .as_ref()
                        .map_or(true, |condition| self.type_condition_matches(condition.node.on.node.as_str()));
                    if matches {
                        self.collect_into(&inline.node.selection_set.node, fields)?;
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !should_include(&spread.node.directives, self.variables)? {
                        continue;
                    }
                    let fragment_name = spread.node.fragment_name.node.as_str();
                    if !self.visited_fragments.insert(fragment_name) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(&spread.node.fragment_name.node) else {
                        return Err(ServerError::new(
                            format!(r#"Unknown fragment "{fragment_name}""#),
                            Some(spread.pos),
                        )
                        .with_classification(ErrorClassification::ValidationError));
                    };
                    if !should_include(&fragment.node.directives, self.variables)? {
                        continue;
                    }
                    if self.type_condition_matches(fragment.node.type_condition.node.on.node.as_str()) {
                        self.collect_into(&fragment.node.selection_set.node, fields)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// A condition matches when it names the object type itself, an interface the object type
    /// implements, or a union the object type is a member of.
    fn type_condition_matches(&self, condition: &str) -> bool {
        condition == self.object_type.name || self.registry.is_possible_type(condition, &self.object_type.name)
    }
}

/// Evaluates `@skip`/`@include` on a selection. Defaults are skip=false, include=true; the
/// selection survives when `!skip && include`.
pub(crate) fn should_include(directives: &[Positioned<Directive>], variables: &Variables) -> ServerResult<bool> {
    let mut include = true;
    for directive in directives {
        let skip_directive = match directive.node.name.node.as_str() {
            "skip" => true,
            "include" => false,
            _ => continue,
        };
        let condition = directive_if_condition(directive, variables)?;
        if skip_directive == condition {
            include = false;
        }
    }
    Ok(include)
}

fn directive_if_condition(directive: &Positioned<Directive>, variables: &Variables) -> ServerResult<bool> {
    let directive_name = directive.node.name.node.as_str();
    let Some(value) = directive.node.get_argument("if") else {
        return Err(ServerError::new(
            format!("Directive @{directive_name} is missing its required `if` argument"),
            Some(directive.pos),
        )
        .with_classification(ErrorClassification::ValidationError));
    };
    let condition = value.node.clone().into_const_with(|variable| {
        variables.get(&variable).cloned().ok_or_else(|| {
            ServerError::new(
                format!("Directive @{directive_name} references the unbound variable `${variable}`"),
                Some(value.pos),
            )
            .with_classification(ErrorClassification::ValidationError)
        })
    })?;
    match condition {
        ConstValue::Boolean(condition) => Ok(condition),
        other => Err(ServerError::new(
            format!(
                "Directive @{directive_name} requires a Boolean `if` argument, found a {}",
                const_value_kind_str(&other)
            ),
            Some(value.pos),
        )
        .with_classification(ErrorClassification::ValidationError)),
    }
}
