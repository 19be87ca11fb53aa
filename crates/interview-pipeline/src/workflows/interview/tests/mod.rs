mod common;
mod monitoring;
mod routing;
