//! Steer a camera and grab scene objects with body pose alone.
//!
//! Landmark frames from an external pose estimator are read into a
//! [`gesture::PoseSymbol`] and a [`gesture::MovementVector`], which drive the
//! [`controller::InteractionController`] once per rendered frame.

pub mod config;
pub mod controller;
pub mod error;
pub mod gesture;
pub mod grab_input;
pub mod landmarks;
pub mod resolver;
pub mod scene;
pub mod session;
pub mod source;
