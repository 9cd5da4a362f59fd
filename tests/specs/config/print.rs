//! `--print-config` specs

use crate::prelude::*;

#[test]
fn prints_defaults_without_config_file() {
    let temp = Project::empty();

    temp.vigild()
        .args(&["--print-config"])
        .passes()
        .stdout_has("[daemon]")
        .stdout_has("tick = \"5s\"")
        .stdout_has("[config_validator]");
}

#[test]
fn picks_up_vigil_toml_in_working_directory() {
    let temp = Project::empty();
    temp.file(
        "vigil.toml",
        "[[probe]]\nname = \"cache\"\naddress = \"127.0.0.1:6379\"\n",
    );

    temp.vigild()
        .args(&["--print-config"])
        .passes()
        .stdout_has("[[probe]]")
        .stdout_has("name = \"cache\"");
}

#[test]
fn database_password_is_not_printed() {
    let temp = Project::empty();
    temp.file(
        "vigil.toml",
        "[database]\nhost = \"pg\"\npassword = \"hunter22-secret\"\n",
    );

    let run = temp.vigild().args(&["--print-config"]).passes();
    assert!(run.stdout().contains("host = \"pg\""));
    assert!(!run.stdout().contains("hunter22-secret"));
}
