use hanlu::{
    command::ShellCommand,
    shell::{ScriptSimulator, ShellSimulator, SimulatedProcess},
};

fn run(script: &str) -> anyhow::Result<Vec<ShellCommand>> {
    let mut commands = vec![];
    ScriptSimulator.simulate(
        script,
        &mut |_: &dyn SimulatedProcess, command: &ShellCommand| commands.push(command.clone()),
    )?;
    Ok(commands)
}

fn commands(script: &str) -> Vec<ShellCommand> {
    run(script).expect("script should be simulated")
}

/// Content of `path` as seen by the command named `reader`.
fn file_seen_by(script: &str, reader: &str, path: &str) -> Option<String> {
    let mut content = None;
    ScriptSimulator
        .simulate(
            script,
            &mut |process: &dyn SimulatedProcess, command: &ShellCommand| {
                if command.name == reader {
                    content = process.read_file(path);
                }
            },
        )
        .expect("script should be simulated");
    content
}

#[test]
fn test_command_separators() {
    assert_eq!(
        commands("a 1; b 2\nc 3 && d 4 || e 5 | f 6 & g\n(h; i)"),
        vec![
            ShellCommand::new("a", &["1"]),
            ShellCommand::new("b", &["2"]),
            ShellCommand::new("c", &["3"]),
            ShellCommand::new("d", &["4"]),
            ShellCommand::new("e", &["5"]),
            ShellCommand::new("f", &["6"]),
            ShellCommand::new("g", &[]),
            ShellCommand::new("h", &[]),
            ShellCommand::new("i", &[]),
        ]
    );
}

#[test]
fn test_quotes_and_escapes() {
    assert_eq!(
        commands(r#"run 'a b' "c d" e\ f "x\"y" 'it'"'"'s' "a\nb""#),
        vec![ShellCommand::new(
            "run",
            &["a b", "c d", "e f", "x\"y", "it's", "a\\nb"]
        )]
    );
}

#[test]
fn test_variables() {
    let script = r#"
DB=dw
TABLE=orders
beeline -e "select * from ${DB}.$TABLE" --x $UNSET ${ALSO_UNSET}
"#;
    assert_eq!(
        commands(script),
        vec![ShellCommand::new(
            "beeline",
            &["-e", "select * from dw.orders", "--x", "$UNSET", "${ALSO_UNSET}"]
        )]
    );
}

#[test]
fn test_assignment_prefix_is_not_recorded() {
    let script = "DB=dw\nDB=ods beeline -e $DB\nrun $DB";
    assert_eq!(
        commands(script),
        vec![
            ShellCommand::new("beeline", &["-e", "dw"]),
            ShellCommand::new("run", &["dw"]),
        ]
    );
}

#[test]
fn test_export() {
    assert_eq!(
        commands("export DB=ods\nbeeline -e $DB"),
        vec![
            ShellCommand::new("export", &["DB=ods"]),
            ShellCommand::new("beeline", &["-e", "ods"]),
        ]
    );
}

#[test]
fn test_comments_and_line_continuation() {
    let script = "# header\nbeeline \\\n  -u url \\\n  -e 'select 1' # trailing\nrun a#b\n";
    assert_eq!(
        commands(script),
        vec![
            ShellCommand::new("beeline", &["-u", "url", "-e", "select 1"]),
            ShellCommand::new("run", &["a#b"]),
        ]
    );
}

#[test]
fn test_heredoc_file() {
    let script = r#"
DB=dw
cat > /tmp/job.sql << EOF
insert overwrite table ${DB}.t select * from ods.t;
EOF
beeline -f /tmp/job.sql
"#;
    assert_eq!(
        commands(script),
        vec![ShellCommand::new("beeline", &["-f", "/tmp/job.sql"])]
    );
    assert_eq!(
        file_seen_by(script, "beeline", "/tmp/job.sql").as_deref(),
        Some("insert overwrite table dw.t select * from ods.t;\n")
    );
}

#[test]
fn test_heredoc_strip_tabs() {
    let script = "cat <<- END > /tmp/a\n\tline1\n\t\tline2\n\tEND\nrun /tmp/a";
    assert_eq!(
        file_seen_by(script, "run", "/tmp/a").as_deref(),
        Some("line1\nline2\n")
    );
}

#[test]
fn test_quoted_heredoc_is_not_expanded() {
    let quoted = "DB=dw\ncat > /tmp/q << 'EOF'\nselect ${DB}\nEOF\nrun";
    assert_eq!(
        file_seen_by(quoted, "run", "/tmp/q").as_deref(),
        Some("select ${DB}\n")
    );
    let unquoted = "DB=dw\ncat > /tmp/q <<EOF\nselect ${DB} from $DB.t\nEOF\nrun";
    assert_eq!(
        file_seen_by(unquoted, "run", "/tmp/q").as_deref(),
        Some("select dw from dw.t\n")
    );
}

#[test]
fn test_heredoc_followed_by_command_on_same_line() {
    let script = "cat > /tmp/a << EOF; first\nbody\nEOF\nsecond";
    assert_eq!(
        commands(script),
        vec![ShellCommand::new("first", &[]), ShellCommand::new("second", &[])]
    );
    assert_eq!(
        file_seen_by(script, "second", "/tmp/a").as_deref(),
        Some("body\n")
    );
}

#[test]
fn test_echo_and_cat_write_files() {
    let script = "echo hello world > /tmp/a\necho again >> /tmp/a\necho two > /tmp/b\ncat /tmp/a /tmp/b > /tmp/c\nrun";
    assert_eq!(
        commands(script),
        vec![
            ShellCommand::new("echo", &["hello", "world"]),
            ShellCommand::new("echo", &["again"]),
            ShellCommand::new("echo", &["two"]),
            ShellCommand::new("run", &[]),
        ]
    );
    assert_eq!(
        file_seen_by(script, "run", "/tmp/c").as_deref(),
        Some("hello world\nagain\ntwo\n")
    );
    assert_eq!(file_seen_by(script, "run", "/tmp/missing"), None);
}

#[test]
fn test_cat_reads_input_redirect() {
    let script = "echo one > /tmp/a\ncat < /tmp/a > /tmp/b\nrun";
    assert_eq!(
        file_seen_by(script, "run", "/tmp/b").as_deref(),
        Some("one\n")
    );

    // copying a file the script never wrote drops what was known about the target
    let script = "echo stale > /tmp/b\ncat < /etc/etl/load.sql > /tmp/b\nrun";
    assert_eq!(file_seen_by(script, "run", "/tmp/b"), None);
    let script = "echo one > /tmp/a\ncat /tmp/a /etc/etl/load.sql > /tmp/b\nrun";
    assert_eq!(file_seen_by(script, "run", "/tmp/b"), None);
}

#[test]
fn test_redirections_are_not_arguments() {
    assert_eq!(
        commands("beeline -e 'select 1' 2>/dev/null >/tmp/out 2>&1 &> /tmp/all < /tmp/in <<< word"),
        vec![ShellCommand::new("beeline", &["-e", "select 1"])]
    );
}

#[test]
fn test_command_substitution_is_kept_verbatim() {
    assert_eq!(
        commands("d=$(date +%Y%m%d)\nrun $d `hostname` \"$(echo (x))\""),
        vec![ShellCommand::new(
            "run",
            &["$(date +%Y%m%d)", "`hostname`", "$(echo (x))"]
        )]
    );
}

#[test]
fn test_control_flow_words_are_dropped() {
    let script = r#"
if true; then
  beeline -e 'x'
else
  exit 1
fi
while read l; do echo $l; done
"#;
    assert_eq!(
        commands(script),
        vec![
            ShellCommand::new("true", &[]),
            ShellCommand::new("beeline", &["-e", "x"]),
            ShellCommand::new("exit", &["1"]),
            ShellCommand::new("read", &["l"]),
            ShellCommand::new("echo", &["$l"]),
        ]
    );
}

#[test]
fn test_should_not_simulate() {
    let scripts = [
        "echo 'abc",
        "echo \"abc",
        "echo ${abc",
        "echo $(date",
        "echo `date",
        "cat << EOF\nno end",
        "cat << EOF",
        "cat <<",
        "echo >",
    ];
    for script in scripts {
        println!("Testing shell error for script: {}", script);
        assert!(run(script).is_err());
    }
}

#[test]
fn test_commands_before_an_error_are_delivered() {
    let mut delivered = vec![];
    let result = ScriptSimulator.simulate(
        "echo ok\necho 'bad",
        &mut |_: &dyn SimulatedProcess, command: &ShellCommand| delivered.push(command.clone()),
    );
    assert!(result.is_err());
    assert_eq!(delivered, vec![ShellCommand::new("echo", &["ok"])]);
}
