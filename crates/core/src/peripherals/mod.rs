pub mod print_monitor;
