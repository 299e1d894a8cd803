mod display_tests;
