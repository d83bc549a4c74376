fn main() {
    println!("cargo:rerun-if-changed=src/");

    if std::env::var_os("CARGO_FEATURE_CSHARP_BINDINGS").is_none() {
        return;
    }

    // Generate C# bindings for .NET interop
    let out_dir = "../../bindings/csharp";
    std::fs::create_dir_all(out_dir).expect("Failed to create bindings directory");

    csbindgen::Builder::default()
        .input_extern_file("src/lib.rs")
        .input_extern_file("src/binding.rs")
        .input_extern_file("src/error.rs")
        .input_extern_file("src/types.rs")
        .csharp_dll_name("wand_ffi")
        .csharp_namespace("MagickWand.Net")
        .csharp_class_name("NativeMethods")
        .csharp_class_accessibility("public")
        .csharp_use_nint_types(false) // Use UIntPtr/IntPtr for netstandard2.0 compatibility
        .generate_csharp_file(format!("{out_dir}/NativeMethods.g.cs"))
        .expect("Failed to generate C# bindings");
}
