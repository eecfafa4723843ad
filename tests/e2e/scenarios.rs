use super::harness::TestContext;

/// Nothing listens on the discard port, so requests fail fast
const UNREACHABLE: &str = "http://127.0.0.1:9";

pub struct Scenario {
    pub name: &'static str,
    pub run: fn(&TestContext) -> Result<(), String>,
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "help_output",
            run: scenario_help,
        },
        Scenario {
            name: "no_args_error",
            run: scenario_no_args,
        },
        Scenario {
            name: "invalid_repo",
            run: scenario_invalid_repo,
        },
        Scenario {
            name: "scan_empty_dir",
            run: scenario_scan_empty_dir,
        },
        Scenario {
            name: "scan_empty_dir_json",
            run: scenario_scan_empty_dir_json,
        },
        Scenario {
            name: "scan_missing_dir",
            run: scenario_scan_missing_dir,
        },
        Scenario {
            name: "scan_malformed_lockfile",
            run: scenario_scan_malformed_lockfile,
        },
        Scenario {
            name: "scan_local_references_only",
            run: scenario_scan_local_references_only,
        },
        Scenario {
            name: "scan_registry_unreachable",
            run: scenario_scan_registry_unreachable,
        },
        Scenario {
            name: "invalid_config",
            run: scenario_invalid_config,
        },
        Scenario {
            name: "invalid_config_overridden_by_flag",
            run: scenario_invalid_config_overridden_by_flag,
        },
        Scenario {
            name: "explicit_config_missing",
            run: scenario_explicit_config_missing,
        },
        Scenario {
            name: "check_api_unreachable",
            run: scenario_check_api_unreachable,
        },
    ]
}

fn scenario_help(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("help")?;
    let output = ctx.run_day0guard(&env, &["--help"], &env.repo)?;
    output.assert_exit(0)?;
    output.assert_stdout_contains("check")?;
    output.assert_stdout_contains("scan")?;
    output.assert_stdout_contains("--window-hours")?;
    Ok(())
}

fn scenario_no_args(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("no-args")?;
    let output = ctx.run_day0guard(&env, &[], &env.repo)?;
    output.assert_exit(1)?;
    output.assert_stderr_contains("No command specified")?;
    Ok(())
}

fn scenario_invalid_repo(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("invalid-repo")?;
    let output = ctx.run_day0guard(&env, &["check", "--repo", "shop", "--sha", "abc"], &env.repo)?;
    output.assert_exit(2)?;
    output.assert_stderr_contains("Expected owner/name")?;
    Ok(())
}

fn scenario_scan_empty_dir(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("scan-empty")?;
    let output = ctx.run_day0guard(&env, &["scan"], &env.repo)?;
    output.assert_exit(0)?;
    output.assert_stdout_contains("neutral: No lockfile parsed")?;
    output.assert_stdout_contains("pnpm-lock.yaml")?;
    Ok(())
}

fn scenario_scan_empty_dir_json(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("scan-empty-json")?;
    let repo = env.repo.to_string_lossy().to_string();
    let output = ctx.run_day0guard(&env, &["scan", &repo, "--json"], &env.home)?;
    output.assert_exit(0)?;
    let json = output.assert_conclusion("neutral")?;
    if json["dependencies"] != 0 || json["checked"] != 0 {
        return Err(format!("Expected nothing checked, got: {}", json));
    }
    Ok(())
}

fn scenario_scan_missing_dir(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("scan-missing")?;
    let output = ctx.run_day0guard(&env, &["scan", "does-not-exist"], &env.repo)?;
    output.assert_exit(1)?;
    output.assert_stderr_contains("is not a directory")?;
    Ok(())
}

fn scenario_scan_malformed_lockfile(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("scan-malformed")?;
    env.write("package-lock.json", "{ this is not json")?;
    env.write("packages/ui/yarn.lock", "# yarn lockfile v1\n")?;

    let output = ctx.run_day0guard(&env, &["scan", "--json"], &env.repo)?;
    output.assert_exit(0)?;
    output.assert_stderr_contains("skipping unparsable lockfile")?;
    output.assert_conclusion("neutral")?;
    Ok(())
}

fn scenario_scan_local_references_only(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("scan-local-refs")?;
    env.write(
        "package-lock.json",
        r#"{
  "lockfileVersion": 3,
  "packages": {
    "": {},
    "node_modules/shared": { "version": "file:../shared" },
    "node_modules/ui": { "version": "link:packages/ui" }
  }
}"#,
    )?;

    let output = ctx.run_day0guard(
        &env,
        &["scan", "--json", "--registry-url", UNREACHABLE],
        &env.repo,
    )?;
    output.assert_exit(0)?;
    let json = output.assert_conclusion("success")?;
    if json["dependencies"] != 2 || json["unknown"] != 2 || json["phase"] != "root_files" {
        return Err(format!("Expected two undated root dependencies, got: {}", json));
    }
    Ok(())
}

fn scenario_scan_registry_unreachable(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("scan-unreachable")?;
    env.write(
        "apps/web/yarn.lock",
        "left-pad@^1.3.0:\n  version \"1.3.0\"\n  resolved \"https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz\"\n",
    )?;

    let output = ctx.run_day0guard(
        &env,
        &["scan", "--json", "--registry-url", UNREACHABLE],
        &env.repo,
    )?;
    output.assert_exit(0)?;
    let json = output.assert_conclusion("success")?;
    if json["dependencies"] != 1 || json["unknown"] != 1 {
        return Err(format!("Expected one unknown dependency, got: {}", json));
    }
    if json["phase"] != "full_scan" || json["lockfiles"][0]["path"] != "apps/web/yarn.lock" {
        return Err(format!("Expected nested yarn.lock from full scan, got: {}", json));
    }
    Ok(())
}

fn scenario_invalid_config(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("invalid-config")?;
    env.write_config(r#"{"window_hours": 0}"#)?;
    let output = ctx.run_day0guard(&env, &["scan"], &env.repo)?;
    output.assert_exit(1)?;
    output.assert_stderr_contains("window_hours")?;
    Ok(())
}

fn scenario_invalid_config_overridden_by_flag(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("invalid-config-flag")?;
    env.write_config(r#"{"window_hours": 0}"#)?;
    let output = ctx.run_day0guard(&env, &["scan", "--json", "--window-hours", "6"], &env.repo)?;
    output.assert_exit(0)?;
    let json = output.assert_conclusion("neutral")?;
    if json["window_hours"] != 6 {
        return Err(format!("Expected the flag's window, got: {}", json));
    }
    Ok(())
}

fn scenario_explicit_config_missing(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("config-missing")?;
    let output = ctx.run_day0guard(&env, &["--config", "absent.json", "scan"], &env.repo)?;
    output.assert_exit(1)?;
    output.assert_stderr_contains("Failed to read config file")?;
    Ok(())
}

fn scenario_check_api_unreachable(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("check-unreachable")?;
    let output = ctx.run_day0guard(
        &env,
        &[
            "check",
            "--repo",
            "acme/shop",
            "--sha",
            "abc123",
            "--api-url",
            UNREACHABLE,
        ],
        &env.repo,
    )?;
    output.assert_exit(1)?;
    output.assert_stderr_contains("Failed to create check run")?;
    Ok(())
}
