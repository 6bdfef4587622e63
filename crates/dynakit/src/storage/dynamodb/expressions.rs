//! Rendering of structured conditions and updates into DynamoDB expressions.
//!
//! Attribute names and values always go through `#nN` / `:vN` placeholders,
//! so reserved words and special characters never reach the expression text.

use std::collections::HashMap;

use dynakit_core::store::{AttributeValue, Condition, UpdateAction, UpdateSpec};

/// Collects placeholders while expressions are rendered.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn name(&mut self, attribute: &str) -> String {
        if let Some(placeholder) = self
            .names
            .iter()
            .find_map(|(placeholder, name)| (name == attribute).then(|| placeholder.clone()))
        {
            return placeholder;
        }
        let placeholder = format!("#n{}", self.names.len());
        self.names
            .insert(placeholder.clone(), attribute.to_string());
        placeholder
    }

    fn value(&mut self, value: &AttributeValue) -> String {
        let placeholder = format!(":v{}", self.values.len());
        self.values.insert(placeholder.clone(), value.clone());
        placeholder
    }

    /// Renders a condition expression; an empty conjunction renders nothing.
    pub fn condition(&mut self, condition: &Condition) -> Option<String> {
        match condition {
            Condition::AttributeExists(attribute) => {
                Some(format!("attribute_exists({})", self.name(attribute)))
            }
            Condition::AttributeNotExists(attribute) => {
                Some(format!("attribute_not_exists({})", self.name(attribute)))
            }
            Condition::Equals(attribute, value) => {
                let name = self.name(attribute);
                Some(format!("{name} = {}", self.value(value)))
            }
            Condition::And(conditions) => {
                let parts: Vec<String> = conditions
                    .iter()
                    .filter_map(|c| self.condition(c))
                    .map(|c| format!("({c})"))
                    .collect();
                (!parts.is_empty()).then(|| parts.join(" AND "))
            }
        }
    }

    /// Renders an update expression grouped into SET, REMOVE and ADD clauses.
    pub fn update(&mut self, update: &UpdateSpec) -> Option<String> {
        let mut set = Vec::new();
        let mut remove = Vec::new();
        let mut add = Vec::new();

        for action in &update.actions {
            match action {
                UpdateAction::Set(attribute, value) => {
                    let name = self.name(attribute);
                    set.push(format!("{name} = {}", self.value(value)));
                }
                UpdateAction::Remove(attribute) => remove.push(self.name(attribute)),
                UpdateAction::Add(attribute, value) => {
                    let name = self.name(attribute);
                    add.push(format!("{name} {}", self.value(value)));
                }
            }
        }

        let clauses: Vec<String> = [("SET", set), ("REMOVE", remove), ("ADD", add)]
            .into_iter()
            .filter(|(_, parts)| !parts.is_empty())
            .map(|(keyword, parts)| format!("{keyword} {}", parts.join(", ")))
            .collect();
        (!clauses.is_empty()).then(|| clauses.join(" "))
    }

    /// Placeholder maps, `None` when empty as the SDK expects.
    pub fn into_parts(
        self,
    ) -> (
        Option<HashMap<String, String>>,
        Option<HashMap<String, AttributeValue>>,
    ) {
        let names = (!self.names.is_empty()).then_some(self.names);
        let values = (!self.values.is_empty()).then_some(self.values);
        (names, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_condition() {
        let mut builder = ExpressionBuilder::new();
        let condition = Condition::And(vec![
            Condition::AttributeExists("id".to_string()),
            Condition::Equals("status".to_string(), AttributeValue::from("open")),
        ]);

        let rendered = builder.condition(&condition).unwrap();
        assert_eq!(rendered, "(attribute_exists(#n0)) AND (#n1 = :v0)");

        let (names, values) = builder.into_parts();
        let names = names.unwrap();
        assert_eq!(names["#n0"], "id");
        assert_eq!(names["#n1"], "status");
        assert_eq!(values.unwrap()[":v0"], AttributeValue::from("open"));
    }

    #[test]
    fn test_empty_conjunction_renders_nothing() {
        let mut builder = ExpressionBuilder::new();
        assert_eq!(builder.condition(&Condition::And(vec![])), None);
        assert_eq!(builder.into_parts(), (None, None));
    }

    #[test]
    fn test_render_update_groups_clauses() {
        let mut builder = ExpressionBuilder::new();
        let update = UpdateSpec::new()
            .set("data", "x")
            .add("count", 1_i64)
            .remove("stale")
            .set("label", "y");

        let rendered = builder.update(&update).unwrap();
        assert_eq!(
            rendered,
            "SET #n0 = :v0, #n3 = :v2 REMOVE #n2 ADD #n1 :v1"
        );
    }

    #[test]
    fn test_repeated_attribute_reuses_placeholder() {
        let mut builder = ExpressionBuilder::new();
        let update = UpdateSpec::new().set("data", "x");
        builder.update(&update);
        let condition = builder
            .condition(&Condition::AttributeExists("data".to_string()))
            .unwrap();
        assert_eq!(condition, "attribute_exists(#n0)");
    }
}
