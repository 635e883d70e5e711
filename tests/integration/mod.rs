mod test_plan;
mod test_preconditions;
mod test_release;
