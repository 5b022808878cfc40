/// Splits raw input into parseable groups, per §4.7: consecutive non-blank
/// lines are joined into a group, runs of blank (whitespace-only) lines are
/// discarded, and each group is re-emitted with a trailing newline.
///
/// This is the only place line structure is observed; the grammar itself
/// only cares about indentation within a group, not blank-line boundaries.
pub fn group_entries(input: &str) -> Vec<String> {
    let mut groups = Vec::new();
    let mut current = String::new();

    for line in input.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_blank_runs() {
        let input = "commodity USD\n    note Dollars\n\n\naccount Assets:Cash\n";
        let groups = group_entries(input);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], "commodity USD\n    note Dollars\n");
        assert_eq!(groups[1], "account Assets:Cash\n");
    }

    #[test]
    fn ignores_leading_and_trailing_blank_runs() {
        let input = "\n\ncommodity USD\n\n\n";
        let groups = group_entries(input);
        assert_eq!(groups, vec!["commodity USD\n".to_string()]);
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group_entries("\n\n   \n").is_empty());
    }
}
