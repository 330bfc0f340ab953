mod cluster_scenarios;
mod rollcall_scenarios;
mod tools;
