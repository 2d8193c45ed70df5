mod field_path_tests;
mod resource_path_tests;
