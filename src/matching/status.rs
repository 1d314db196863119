//! Matching totals for reporting.

use serde::Serialize;

use crate::matching::Matcher;

/// Totals and matched counts per entity kind. Members contribute only
/// when real; synthesized hierarchy placeholders are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchingStatus {
    pub total_class_count: usize,
    pub matched_class_count: usize,
    pub total_method_count: usize,
    pub matched_method_count: usize,
    pub total_method_arg_count: usize,
    pub matched_method_arg_count: usize,
    pub total_method_var_count: usize,
    pub matched_method_var_count: usize,
    pub total_field_count: usize,
    pub matched_field_count: usize,
}

impl Matcher {
    /// Count side-A entities and how many are matched. With
    /// `inputs_only`, classes without an input artifact are skipped.
    pub fn status(&self, inputs_only: bool) -> MatchingStatus {
        let env = &self.env;
        let mut status = MatchingStatus::default();

        for &cls in env.classes_a() {
            let class = env.class(cls);

            if inputs_only && !class.is_input() {
                continue;
            }

            status.total_class_count += 1;

            if class.has_match() {
                status.matched_class_count += 1;
            }

            for &m in class.methods() {
                let method = env.method(m);

                if !method.is_real() {
                    continue;
                }

                status.total_method_count += 1;

                if method.has_match() {
                    status.matched_method_count += 1;
                }

                for &arg in method.args() {
                    status.total_method_arg_count += 1;

                    if env.var(arg).has_match() {
                        status.matched_method_arg_count += 1;
                    }
                }

                for &var in method.locals() {
                    status.total_method_var_count += 1;

                    if env.var(var).has_match() {
                        status.matched_method_var_count += 1;
                    }
                }
            }

            for &f in class.fields() {
                let field = env.field(f);

                if !field.is_real() {
                    continue;
                }

                status.total_field_count += 1;

                if field.has_match() {
                    status.matched_field_count += 1;
                }
            }
        }

        status
    }
}
