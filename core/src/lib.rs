#![cfg_attr(not(test), no_std)]

pub mod application;
pub mod catalog;
pub mod compositor;
pub mod config;
pub mod display;
pub mod framebuffer;
pub mod fs;
pub mod input;
pub mod net;
pub mod palette;
pub mod scr;
