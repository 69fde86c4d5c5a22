pub mod radial_symmetry_detector;
