pub mod account;
pub mod admin;
pub mod catalog;
pub mod checkout;
pub mod exams;
pub mod learning;
