pub mod aviation;
pub mod cyber;
pub mod cyclone;
pub mod disaster;
pub mod earthquake;
pub mod maritime;
pub mod rss_generic;
pub mod social;
pub mod travel;
pub mod tsunami;
pub mod volcano;
pub mod weather;
pub mod wildfire;
