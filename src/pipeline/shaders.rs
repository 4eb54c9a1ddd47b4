pub mod normal_map;
