#[allow(non_snake_case)]
pub mod Canonical;
#[allow(non_snake_case)]
pub mod Driver;
#[allow(non_snake_case)]
pub mod Emitters;
#[allow(non_snake_case)]
pub mod Grammar;
#[allow(non_snake_case)]
pub mod Interchange;
#[allow(non_snake_case)]
pub mod PatternModel;
#[allow(non_snake_case)]
pub mod Utils;
pub mod cli;
pub mod settings;
