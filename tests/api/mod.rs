mod commands_tests;
mod health_tests;
