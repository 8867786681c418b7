//! Rendering of command results for humans or as JSON.

use anyhow::Result;
use dirmgr_core::error::{Error, ErrorResponse};
use dirmgr_ldap::{DistinguishedName, Employee, Group, LdapEntry};
use serde::Serialize;
use serde_json::json;

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn print_message(message: &str, json: bool) -> Result<()> {
    if json {
        print_json(&json!({ "status": "ok", "message": message }))
    } else {
        println!("{message}");
        Ok(())
    }
}

pub(crate) fn print_dn(action: &str, dn: &DistinguishedName, json: bool) -> Result<()> {
    if json {
        print_json(&json!({ "status": action, "dn": dn.as_str() }))
    } else {
        println!("{action} {dn}");
        Ok(())
    }
}

pub(crate) fn print_entries(entries: &[LdapEntry], json: bool) -> Result<()> {
    if json {
        let rendered = entries
            .iter()
            .map(|entry| json!({ "dn": entry.dn, "attributes": entry.attributes }))
            .collect::<Vec<_>>();
        return print_json(&rendered);
    }

    for entry in entries {
        println!("dn: {}", entry.dn);
        let mut names = entry.attributes.keys().collect::<Vec<_>>();
        names.sort();
        for name in names {
            for value in &entry.attributes[name] {
                println!("  {name}: {value}");
            }
        }
    }
    println!("{} entries", entries.len());
    Ok(())
}

pub(crate) fn print_employee(employee: &Employee, json: bool) -> Result<()> {
    if json {
        return print_json(employee);
    }

    println!("dn: {}", employee.dn);
    println!("  employeeNumber: {}", employee.employee_number);
    if let Some(name) = employee.display_name() {
        println!("  name: {name}");
    }
    if let Some(mail) = &employee.mail {
        println!("  mail: {mail}");
    }
    Ok(())
}

pub(crate) fn print_group(group: &Group, json: bool) -> Result<()> {
    if json {
        return print_json(group);
    }

    println!("dn: {}", group.dn);
    if let Some(gid) = group.gid_number {
        println!("  gidNumber: {gid}");
    }
    println!("  members ({}):", group.member_count());
    for member in &group.members {
        println!("    {member}");
    }
    Ok(())
}

/// Renders a failed command on stderr. In JSON mode directory errors keep their stable code.
pub(crate) fn print_error(err: &anyhow::Error, json: bool) {
    if !json {
        eprintln!("error: {err:#}");
        return;
    }

    let response = match err.downcast_ref::<Error>() {
        Some(directory_error) => {
            let mut response = directory_error.clone().into_error_response();
            response.message = format!("{err:#}");
            response
        }
        None => ErrorResponse {
            code: "CLI_ERROR".to_string(),
            message: format!("{err:#}"),
            result_code: None,
        },
    };

    match serde_json::to_string_pretty(&response) {
        Ok(rendered) => eprintln!("{rendered}"),
        Err(_) => eprintln!("error: {err:#}"),
    }
}
