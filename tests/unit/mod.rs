mod common;

mod ljoin_tests;
mod transaction_tests;
