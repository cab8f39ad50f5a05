pub mod edge_list;
pub mod parser;
