//! Static entity-type catalog with append-only custom registration

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

/// Broad grouping of entity types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EntityCategory {
    /// Work items that can be assigned to people
    Assignable,
    /// Containers that own work items
    ProjectContainer,
    /// Time-boxed planning units
    Planning,
    /// Reference and system data
    System,
    /// Discovered at runtime from the remote catalog
    Custom,
}

/// Static description of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTypeDescriptor {
    /// Type name as used in endpoints and queries
    pub name: String,
    /// Category
    pub category: EntityCategory,
    /// Whether `CustomField.*` paths are meaningful for this type
    pub supports_custom_fields: bool,
    /// Types this one is usually nested under
    pub parent_types: Vec<String>,
    /// Includes commonly requested alongside this type
    pub common_includes: Vec<String>,
}

impl EntityTypeDescriptor {
    fn builtin(
        name: &str,
        category: EntityCategory,
        parents: &[&str],
        includes: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            category,
            supports_custom_fields: !matches!(category, EntityCategory::System),
            parent_types: parents.iter().map(ToString::to_string).collect(),
            common_includes: includes.iter().map(ToString::to_string).collect(),
        }
    }

    /// Descriptor for a type reported by the remote catalog but unknown locally
    #[must_use]
    pub fn custom(name: &str) -> Self {
        Self {
            name: name.to_string(),
            category: EntityCategory::Custom,
            supports_custom_fields: true,
            parent_types: Vec::new(),
            common_includes: Vec::new(),
        }
    }
}

const WORK_ITEM_INCLUDES: &[&str] = &["Project", "Team", "EntityState", "AssignedUser"];

fn builtin_descriptors() -> Vec<EntityTypeDescriptor> {
    use EntityCategory::{Assignable, Planning, ProjectContainer, System};
    use EntityTypeDescriptor as D;

    vec![
        // Assignable work items
        D::builtin("UserStory", Assignable, &["Feature", "Project"], WORK_ITEM_INCLUDES),
        D::builtin("Bug", Assignable, &["UserStory", "Project"], WORK_ITEM_INCLUDES),
        D::builtin("Task", Assignable, &["UserStory"], WORK_ITEM_INCLUDES),
        D::builtin("Feature", Assignable, &["Epic", "Project"], WORK_ITEM_INCLUDES),
        D::builtin("Epic", Assignable, &["PortfolioEpic", "Project"], WORK_ITEM_INCLUDES),
        D::builtin("PortfolioEpic", Assignable, &["Project"], &["Project", "EntityState"]),
        D::builtin("Request", Assignable, &["Project"], &["Project", "Requester", "EntityState"]),
        D::builtin("TestCase", Assignable, &["Project"], &["Project", "TestPlans"]),
        D::builtin("TestPlan", Assignable, &["Project"], &["Project", "TestCases"]),
        D::builtin("TestPlanRun", Assignable, &["TestPlan"], &["TestPlan", "EntityState"]),
        D::builtin("Impediment", Assignable, &["Project"], &["Project", "Responsible"]),
        // Containers
        D::builtin("Project", ProjectContainer, &["Program"], &["Program", "Process", "Owner"]),
        D::builtin("Program", ProjectContainer, &[], &["Projects"]),
        D::builtin("Team", ProjectContainer, &[], &["Projects", "TeamMembers"]),
        // Planning
        D::builtin("Release", Planning, &["Project"], &["Project"]),
        D::builtin("Iteration", Planning, &["Release"], &["Release", "Project"]),
        D::builtin("TeamIteration", Planning, &["Team"], &["Team"]),
        D::builtin("Build", Planning, &["Release", "Iteration"], &["Project"]),
        D::builtin("TimeSheet", Planning, &["Assignable"], &["User", "Assignable"]),
        // System
        D::builtin("User", System, &[], &["Role"]),
        D::builtin("GeneralUser", System, &[], &[]),
        D::builtin("Role", System, &[], &[]),
        D::builtin("EntityState", System, &["Process"], &["Process", "EntityType"]),
        D::builtin("Priority", System, &[], &["EntityType"]),
        D::builtin("Severity", System, &[], &[]),
        D::builtin("Process", System, &[], &["Projects"]),
        D::builtin("Workflow", System, &["Process"], &["Process"]),
        D::builtin("Tag", System, &[], &[]),
        D::builtin("Comment", System, &["General"], &["General", "Owner"]),
        D::builtin("Attachment", System, &["General"], &["General", "Owner"]),
        D::builtin("CustomField", System, &["Process"], &["Process", "EntityType"]),
    ]
}

/// Registry of known entity types.
///
/// Seeded from a static table; custom descriptors are appended when the
/// remote catalog reports names the table does not know. Entries are never
/// removed.
#[derive(Debug)]
pub struct EntityRegistry {
    descriptors: RwLock<BTreeMap<String, EntityTypeDescriptor>>,
}

impl EntityRegistry {
    /// Registry holding only the built-in types
    #[must_use]
    pub fn with_defaults() -> Self {
        let descriptors = builtin_descriptors()
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Self {
            descriptors: RwLock::new(descriptors),
        }
    }

    /// All known type names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.descriptors.read().keys().cloned().collect()
    }

    /// Names of the built-in `System` types, sorted
    #[must_use]
    pub fn system_type_names(&self) -> Vec<String> {
        self.descriptors
            .read()
            .values()
            .filter(|d| d.category == EntityCategory::System)
            .map(|d| d.name.clone())
            .collect()
    }

    /// Look up a descriptor by exact name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<EntityTypeDescriptor> {
        self.descriptors.read().get(name).cloned()
    }

    /// Snapshot of every descriptor, sorted by name
    #[must_use]
    pub fn descriptors(&self) -> Vec<EntityTypeDescriptor> {
        self.descriptors.read().values().cloned().collect()
    }

    /// Register unknown names as `Custom` descriptors, returning how many were added
    pub fn register_custom_types(&self, names: &[String]) -> usize {
        let mut descriptors = self.descriptors.write();
        let mut added = 0;
        for name in names {
            let name = name.trim();
            if name.is_empty() || descriptors.contains_key(name) {
                continue;
            }
            debug!(entity_type = name, "Registering custom entity type");
            descriptors.insert(name.to_string(), EntityTypeDescriptor::custom(name));
            added += 1;
        }
        added
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let registry = EntityRegistry::with_defaults();
        let names = registry.names();
        assert!(names.contains(&"UserStory".to_string()));
        assert!(names.contains(&"TimeSheet".to_string()));
        assert_eq!(names.len(), 31);

        let bug = registry.get("Bug").unwrap();
        assert_eq!(bug.category, EntityCategory::Assignable);
        assert!(bug.supports_custom_fields);
        assert!(!registry.get("Priority").unwrap().supports_custom_fields);
    }

    #[test]
    fn test_system_type_names() {
        let registry = EntityRegistry::with_defaults();
        let system = registry.system_type_names();
        assert_eq!(system.len(), 12);
        assert!(system.contains(&"EntityState".to_string()));
        assert!(!system.contains(&"Bug".to_string()));
    }

    #[test]
    fn test_custom_registration_is_append_only() {
        let registry = EntityRegistry::with_defaults();
        let added = registry.register_custom_types(&[
            "Bug".to_string(),
            "Objective".to_string(),
            " ".to_string(),
            "Objective".to_string(),
        ]);
        assert_eq!(added, 1);
        assert_eq!(registry.get("Objective").unwrap().category, EntityCategory::Custom);
        assert_eq!(registry.get("Bug").unwrap().category, EntityCategory::Assignable);
        assert_eq!(registry.descriptors().len(), 32);
    }
}
