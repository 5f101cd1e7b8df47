use std::cmp::Ordering;

use super::*;

fn version(input: &str) -> ProductVersion {
    ProductVersion::parse(input).expect("version should parse")
}

fn all_supported() -> Vec<(Platform, InstallMethod)> {
    let mut combos = Vec::new();
    for family in [
        PlatformFamily::Rhel,
        PlatformFamily::Debian,
        PlatformFamily::Suse,
        PlatformFamily::Windows,
        PlatformFamily::MacOs,
    ] {
        for arch in [Arch::X86_64, Arch::X86] {
            if family == PlatformFamily::MacOs && arch == Arch::X86 {
                continue;
            }
            for method in [InstallMethod::Package, InstallMethod::Archive] {
                combos.push((Platform::new(family, arch), method));
            }
        }
    }
    combos
}

#[test]
fn parse_release_and_prerelease_versions() {
    let release = version("6.3.4");
    assert_eq!(release.major(), 6);
    assert_eq!(release.minor(), 3);
    assert_eq!(release.patch(), 4);
    assert!(!release.is_prerelease());
    assert!(release.build().is_none());

    let pre = version("7.0.0-beta.2+cae2458f4aef");
    assert!(pre.is_prerelease());
    assert_eq!(pre.prerelease(), Some("beta.2"));
    assert_eq!(pre.build(), Some("cae2458f4aef"));
    assert_eq!(pre.to_string(), "7.0.0-beta.2+cae2458f4aef");
}

#[test]
fn parse_two_part_version_defaults_patch() {
    let parsed = version("7.1");
    assert_eq!(parsed, ProductVersion::new(7, 1, 0));
    assert_eq!(parsed.to_string(), "7.1.0");
}

#[test]
fn parse_rejects_malformed_input_naming_token() {
    for (input, token) in [
        ("", ""),
        ("6", "6"),
        ("6.x.4", "x"),
        ("6.3.4.1", "6.3.4.1"),
        ("6.3.4-", "-"),
        ("6.3.4+", "+"),
        ("6.3.4-be ta", "be ta"),
    ] {
        let err = ProductVersion::parse(input).expect_err("malformed version must fail");
        match err {
            IngredientError::InvalidVersion { token: found, .. } => {
                assert_eq!(found, token, "unexpected token for '{input}'")
            }
            other => panic!("unexpected error for '{input}': {other}"),
        }
    }
}

#[test]
fn numeric_fields_compare_numerically() {
    assert!(version("6.10.0") > version("6.9.9"));
    assert!(version("10.0.0") > version("9.12.1"));
    assert_eq!(version("6.3.4"), version("6.3.4"));
}

#[test]
fn prerelease_sorts_directly_below_release() {
    let release = version("7.0.0");
    let pre = version("7.0.0-beta");
    assert_eq!(pre.compare(&release), Some(Ordering::Less));
    assert_eq!(release.compare(&pre), Some(Ordering::Greater));
    assert!(pre > version("6.99.99"));
    assert!(version("7.0.0-alpha") < version("7.0.0-beta"));
}

#[test]
fn build_only_participates_in_equality() {
    let left = version("6.3.4+aaaa");
    let right = version("6.3.4+bbbb");
    assert_ne!(left, right);
    assert_eq!(left.compare(&right), None);
    assert_eq!(left, version("6.3.4"));
    assert_eq!(left, version("6.3.4+aaaa"));
    assert!(left < version("6.3.5+bbbb"));
}

#[test]
fn version_deserializes_from_string() {
    #[derive(serde::Deserialize)]
    struct Holder {
        version: ProductVersion,
    }

    let holder: Holder = toml::from_str("version = \"6.3.4\"").expect("must parse");
    assert_eq!(holder.version, ProductVersion::new(6, 3, 4));

    let err = toml::from_str::<Holder>("version = \"six\"").err();
    assert!(err.is_some(), "invalid version must fail deserialization");
}

#[test]
fn platform_names_map_to_families() {
    for (name, family) in [
        ("redhat", PlatformFamily::Rhel),
        ("centos", PlatformFamily::Rhel),
        ("ubuntu", PlatformFamily::Debian),
        ("debian", PlatformFamily::Debian),
        ("suse", PlatformFamily::Suse),
        ("windows", PlatformFamily::Windows),
        ("mac_os_x", PlatformFamily::MacOs),
    ] {
        assert_eq!(
            PlatformFamily::from_platform_name(name).expect("platform must be known"),
            family
        );
    }

    let err = PlatformFamily::from_platform_name("aix").expect_err("aix is unsupported");
    assert!(err.to_string().starts_with("Unsupported Combination"));
}

#[test]
fn os_release_prefers_first_known_candidate() {
    let raw = "NAME=\"openSUSE Leap\"\nID=\"opensuse-leap\"\nID_LIKE=\"suse opensuse\"\n";
    assert_eq!(
        linux_family_from_os_release(raw).expect("suse must be detected"),
        PlatformFamily::Suse
    );

    let raw = "ID=rocky\nID_LIKE=\"rhel centos fedora\"\n";
    assert_eq!(
        linux_family_from_os_release(raw).expect("rhel must be detected"),
        PlatformFamily::Rhel
    );

    assert!(linux_family_from_os_release("ID=alpine\n").is_err());
}

#[test]
fn resolves_redhat_forwarder_rpm() {
    let platform = Platform::from_names("redhat", "x86_64").expect("platform");
    let resolved = resolve_download_url(
        platform,
        Flavor::UniversalForwarder,
        &version("6.3.4"),
        "cae2458f4aef",
        None,
        InstallMethod::Package,
    )
    .expect("must resolve");

    assert_eq!(
        resolved.url,
        "https://download.splunk.com/products/universalforwarder/releases/6.3.4/linux/splunkforwarder-6.3.4-cae2458f4aef-linux-2.6-x86_64.rpm"
    );
    assert_eq!(resolved.format, PackageFormat::Rpm);
    assert_eq!(
        resolved.filename,
        "splunkforwarder-6.3.4-cae2458f4aef-linux-2.6-x86_64.rpm"
    );
}

#[test]
fn resolves_with_base_url_override() {
    let platform = Platform::from_names("redhat", "x86_64").expect("platform");
    let resolved = resolve_download_url(
        platform,
        Flavor::UniversalForwarder,
        &version("6.3.4"),
        "cae2458f4aef",
        Some("https://repo.internet.website/splunk/"),
        InstallMethod::Package,
    )
    .expect("must resolve");

    assert_eq!(
        resolved.url,
        "https://repo.internet.website/splunk/universalforwarder/releases/6.3.4/linux/splunkforwarder-6.3.4-cae2458f4aef-linux-2.6-x86_64.rpm"
    );
}

#[test]
fn resolves_windows_msi_and_zip() {
    let platform = Platform::from_names("windows", "x64").expect("platform");
    let msi = resolve_download_url(
        platform,
        Flavor::Splunk,
        &version("6.3.4"),
        "cae2458f4aef",
        None,
        InstallMethod::Package,
    )
    .expect("must resolve");
    assert_eq!(
        msi.url,
        "https://download.splunk.com/products/splunk/releases/6.3.4/windows/splunk-6.3.4-cae2458f4aef-x64-release.msi"
    );

    let zip = resolve_download_url(
        platform,
        Flavor::Splunk,
        &version("6.3.4"),
        "cae2458f4aef",
        None,
        InstallMethod::Archive,
    )
    .expect("must resolve");
    assert_eq!(zip.format, PackageFormat::Zip);
    assert_eq!(zip.filename, "splunk-6.3.4-cae2458f4aef-windows-64.zip");
}

#[test]
fn suse_package_install_falls_back_to_archive() {
    let platform = Platform::from_names("suse", "x86_64").expect("platform");
    assert_eq!(
        installer_format(platform, InstallMethod::Package),
        PackageFormat::TarGz
    );
    let resolved = resolve_download_url(
        platform,
        Flavor::Splunk,
        &version("6.3.4"),
        "cae2458f4aef",
        None,
        InstallMethod::Package,
    )
    .expect("must resolve");
    assert_eq!(resolved.filename, "splunk-6.3.4-cae2458f4aef-Linux-x86_64.tgz");
}

#[test]
fn macos_x86_is_unsupported_combination() {
    let platform = Platform::new(PlatformFamily::MacOs, Arch::X86);
    let err = resolve_download_url(
        platform,
        Flavor::Splunk,
        &version("6.3.4"),
        "cae2458f4aef",
        None,
        InstallMethod::Package,
    )
    .expect_err("32-bit macOS has no artifact");
    assert!(matches!(err, IngredientError::UnsupportedCombination(_)));
}

#[test]
fn every_supported_url_round_trips_to_a_filename_with_version_and_build() {
    for (platform, method) in all_supported() {
        for flavor in [Flavor::Splunk, Flavor::UniversalForwarder] {
            let resolved = resolve_download_url(
                platform,
                flavor,
                &version("6.3.4"),
                "cae2458f4aef",
                None,
                method,
            )
            .unwrap_or_else(|err| panic!("{platform} {flavor} {method:?}: {err}"));
            let filename = filename_from_url(&resolved.url);
            assert_eq!(filename, resolved.filename);
            assert!(filename.contains("6.3.4"), "{filename}");
            assert!(filename.contains("cae2458f4aef"), "{filename}");
            assert!(filename.starts_with(flavor.package_name()), "{filename}");
            assert_eq!(
                PackageFormat::infer_from_url(&resolved.url),
                Some(resolved.format),
                "{filename}"
            );
        }
    }
}

#[test]
fn resolver_is_deterministic() {
    let platform = Platform::from_names("ubuntu", "amd64").expect("platform");
    let first = resolve_download_url(
        platform,
        Flavor::Splunk,
        &version("7.2.1"),
        "be11b2c46e23",
        None,
        InstallMethod::Package,
    )
    .expect("must resolve");
    let second = resolve_download_url(
        platform,
        Flavor::Splunk,
        &version("7.2.1"),
        "be11b2c46e23",
        None,
        InstallMethod::Package,
    )
    .expect("must resolve");
    assert_eq!(first, second);
    assert_eq!(
        first.filename,
        "splunk-7.2.1-be11b2c46e23-linux-2.6-amd64.deb"
    );
}

#[test]
fn default_install_dirs_per_family() {
    let linux = Platform::new(PlatformFamily::Rhel, Arch::X86_64);
    let windows = Platform::new(PlatformFamily::Windows, Arch::X86_64);
    let mac = Platform::new(PlatformFamily::MacOs, Arch::X86_64);

    assert_eq!(
        default_install_dir(linux, Flavor::Splunk),
        std::path::PathBuf::from("/opt/splunk")
    );
    assert_eq!(
        default_install_dir(linux, Flavor::UniversalForwarder),
        std::path::PathBuf::from("/opt/splunkforwarder")
    );
    assert_eq!(
        default_install_dir(windows, Flavor::UniversalForwarder),
        std::path::PathBuf::from(r"C:\Program Files\SplunkUniversalForwarder")
    );
    assert_eq!(
        default_install_dir(mac, Flavor::Splunk),
        std::path::PathBuf::from("/Applications/Splunk")
    );
}

#[test]
fn filename_from_url_ignores_query_and_fragment() {
    assert_eq!(
        filename_from_url("https://example.test/apps/my_app-1.2.spl?token=abc#frag"),
        "my_app-1.2.spl"
    );
    assert_eq!(filename_from_url("https://example.test/dir/"), "dir");
}

#[test]
fn flavor_parses_known_aliases() {
    assert_eq!(Flavor::parse("universal_forwarder"), Some(Flavor::UniversalForwarder));
    assert_eq!(Flavor::parse("splunkforwarder"), Some(Flavor::UniversalForwarder));
    assert_eq!(Flavor::parse("SPLUNK"), Some(Flavor::Splunk));
    assert_eq!(Flavor::parse("hotcakes"), None);
}
