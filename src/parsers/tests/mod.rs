mod email_extractor_tests;
