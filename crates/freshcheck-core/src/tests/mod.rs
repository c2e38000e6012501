/*! Scenario coverage for the freshness engine.
 *
 * Unit tests next to each module pin down single operations. These suites drive whole graphs,
 * function walks and translation units through the situations the checker exists for: chains of
 * derived values, branch joins, pointers into stale data and summaries crossing call boundaries.
 */

mod graph_property_tests;
mod walker_scenario_tests;
