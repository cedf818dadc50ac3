//! Integration tests for profiler_sessions

mod profiler_integration_tests;
