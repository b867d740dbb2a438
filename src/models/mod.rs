//! Domain models for the performance manager.
//!
//! # Core Concepts
//!
//! - [`Employee`]: a person in the organisation. Anyone referenced as another
//!   employee's `manager_id` is a manager. Employees are seed data and are
//!   never edited through the application.
//! - [`Goal`]: an objective a manager sets for one direct report, with a due
//!   date and a [`GoalStatus`].
//! - [`Task`]: a unit of work the goal's employee logs against it. Tasks start
//!   unapproved and are approved by the manager.
//! - [`Feedback`]: immutable commentary a manager attaches to a goal.
//!
//! ## Read models
//!
//! - [`PerformanceRecord`]: one row of an employee's goal and feedback history.
//! - [`Insights`]: aggregate metrics shown on the insights page.

mod employee;
mod feedback;
mod goal;
mod report;
mod task;

pub use employee::*;
pub use feedback::*;
pub use goal::*;
pub use report::*;
pub use task::*;
