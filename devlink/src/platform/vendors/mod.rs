//! Built-in vendor platform definitions.
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).

pub mod arista_eos;
pub mod cisco_ios;
pub mod cisco_nxos;
pub mod generic;
pub mod juniper_junos;
pub mod linux;
