mod merge_rules;
