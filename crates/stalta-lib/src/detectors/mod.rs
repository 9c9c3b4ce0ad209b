pub mod stalta;
