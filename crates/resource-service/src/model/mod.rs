//! # Record Kinds
//!
//! The concrete kinds served by this service. Each one is a plain struct with
//! an explicit [`Schema`](resource_framework::Schema); the framework provides
//! storage, validation, serialization and permissions for all of them.
//!
//! | Kind | References | Owned |
//! |------|------------|-------|
//! | [`Product`] | | yes |
//! | [`Department`] | | |
//! | [`Employee`] | `department → departments` | |
//! | [`Question`] | | |
//! | [`Choice`] | `question → questions` | |
//! | [`Marks`] | `question → questions` | |

pub mod choice;
pub mod department;
pub mod employee;
pub mod marks;
pub mod product;
pub mod question;

pub use choice::Choice;
pub use department::Department;
pub use employee::Employee;
pub use marks::Marks;
pub use product::Product;
pub use question::Question;
