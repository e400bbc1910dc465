// Pipeline stages, in data-flow order: raw -> cleaned -> featured ->
// {train, test} -> model -> metrics. Each stage is a file-to-file
// transformation that either writes a complete artifact or nothing.

pub mod clean;
pub mod evaluate;
pub mod features;
pub mod split;
pub mod train;
