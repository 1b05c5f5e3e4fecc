#![cfg(unix)]

mod common;
mod session_tests;
