//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the garage against mock
//! adapters.  All tests run on the host (x86_64) with no real hardware
//! required.

mod event_loop_tests;
mod garage_scenario_tests;
mod lane_isolation_tests;
mod mock_hw;
