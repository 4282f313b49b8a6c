//! Input collection: titles, statement sections, validation and plan files

pub mod plan;
pub mod specification;
pub mod titles;
pub mod validation;

pub use plan::{load_plan, BatchPlan, PlanStatement, PlanValue};
pub use specification::{BatchSpecification, SectionKind, SpecificationEvent, StatementSection};
pub use titles::{ensure_file_namespace, split_title_input};
pub use validation::{validate, ValidationError, Validity};
