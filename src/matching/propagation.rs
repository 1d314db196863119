//! Name propagation across method hierarchy cliques.
//!
//! Mapped names attach to single entities; an override chain only needs
//! one of its members named for the rest to follow. This pass walks every
//! clique once, collects the first mapped method name and the first
//! mapped name per arg slot, and hands them to the members still missing
//! theirs.

use std::collections::HashSet;

use log::info;

use crate::matching::Matcher;
use crate::parallel::Progress;

impl Matcher {
    /// Spread mapped method and arg names across side-B hierarchy
    /// cliques. Returns whether anything was propagated.
    pub fn propagate_names(&mut self, progress: Progress) -> bool {
        let classes = self.env.classes_b().to_vec();
        let total = classes.len();
        let mut checked = HashSet::new();
        let mut propagated_method_names = 0usize;
        let mut propagated_arg_names = 0usize;

        for (current, cls) in classes.into_iter().enumerate() {
            for method in self.env.class(cls).methods().to_vec() {
                if self.env.hierarchy_members(method).len() <= 1 {
                    continue;
                }

                if !checked.insert(method) {
                    continue;
                }

                let mut name = self.env.method_mapped_name(method).map(str::to_owned);

                if name.is_some() && self.env.has_all_args_mapped(method) {
                    continue;
                }

                let members = self.env.hierarchy_members(method).to_vec();
                checked.extend(members.iter().copied());

                let arg_count = self.env.method(method).args().len();
                let mut arg_names: Vec<Option<String>> = vec![None; arg_count];
                let mut missing_args = arg_count;

                'collect: for &member in &members {
                    if name.is_none() {
                        name = self.env.method_mapped_name(member).map(str::to_owned);

                        if name.is_some() && missing_args == 0 {
                            break;
                        }
                    }

                    if missing_args > 0 {
                        let args = self.env.method(member).args().to_vec();

                        for (slot, arg) in args.iter().enumerate().take(arg_count) {
                            if arg_names[slot].is_some() {
                                continue;
                            }

                            if let Some(found) = self.env.var_mapped_name(*arg) {
                                arg_names[slot] = Some(found.to_owned());
                                missing_args -= 1;

                                if name.is_some() && missing_args == 0 {
                                    break 'collect;
                                }
                            }
                        }
                    }
                }

                if name.is_none() && missing_args == arg_count {
                    continue;
                }

                for &member in &members {
                    if let Some(name) = &name {
                        if self.env.method_mapped_name(member).is_none() {
                            self.env
                                .set_method_mapped_name(member, Some(name.clone()));
                            propagated_method_names += 1;
                        }
                    }

                    let args = self.env.method(member).args().to_vec();

                    for (slot, arg) in args.iter().enumerate().take(arg_count) {
                        let Some(arg_name) = &arg_names[slot] else {
                            continue;
                        };

                        if self.env.var_mapped_name(*arg).is_none() {
                            self.env.set_var_mapped_name(*arg, Some(arg_name.clone()));
                            propagated_arg_names += 1;
                        }
                    }
                }
            }

            if (current + 1) % 16 == 0 {
                progress((current + 1) as f64 / total as f64);
            }
        }

        info!(
            "Propagated {propagated_method_names} method names, {propagated_arg_names} method arg names."
        );

        propagated_method_names > 0 || propagated_arg_names > 0
    }
}
