//! Monthly claims experience and budget inputs

mod data;
pub mod loader;

pub use data::{BudgetRecord, ClaimCategory, ExperienceRecord};
pub use loader::{
    load_budgets, load_budgets_from_reader, load_experience, load_experience_from_reader,
    load_portfolio_from_reader,
};
