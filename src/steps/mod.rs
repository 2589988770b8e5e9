//! Wizard step definitions: file schema, route templates, compiled graphs and
//! the registry that loads them

pub mod graph;
pub mod loader;
pub mod route;
pub mod schema;

pub use graph::{FormSpec, Step, StepGraph};
pub use loader::WizardRegistry;
pub use route::RouteTemplate;
pub use schema::{DefinitionFormat, FormSchema, StepSchema, WizardDefinition};
