//! Parser tests.

mod expr_tests;
mod template_tests;
